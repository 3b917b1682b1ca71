pub mod format;
pub mod size;
pub mod speed;

use std::time::{Duration, Instant};

use serde::Serialize;

pub use format::{FormatError, NumFormat};
pub use size::Unit;
pub use speed::{ewma_speed, AverageSpeed};

/// Snapshot of a bar handed to every decorator on each refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: i64,
    pub current: i64,
    pub completed: bool,
}

/// One piece of a bar's text, rendered on every refresh tick.
///
/// Only `decor` is required. The hooks default to no-ops so the bar can
/// forward every event to every decorator and let each pick what it needs.
pub trait Decorator: Send {
    fn decor(&mut self, st: &Statistics) -> String;

    /// `n` units of work finished, taking `work_duration` when known.
    fn next_amount(&mut self, _n: i64, _work_duration: Option<Duration>) {}

    /// Text shown instead of the last value once the bar completes.
    fn on_complete_message(&mut self, _msg: String) {}

    /// Moves the reference point of time based averages.
    fn average_adjust(&mut self, _start: Instant) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidthFlags {
    /// Left-justify, padding on the right.
    pub ident_right: bool,
    /// Reserve one more column than `width`.
    pub extra_space: bool,
}

/// Minimum width and alignment applied to a decorator's final text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidthConfig {
    pub width: usize,
    pub flags: WidthFlags,
}

impl WidthConfig {
    pub fn new(width: usize) -> Self {
        Self { width, ..Self::default() }
    }

    pub fn ident_right(mut self) -> Self {
        self.flags.ident_right = true;
        self
    }

    pub fn extra_space(mut self) -> Self {
        self.flags.extra_space = true;
        self
    }

    pub fn format_msg(&self, msg: &str) -> String {
        let width = self.width + usize::from(self.flags.extra_space);
        let pad = width.saturating_sub(msg.chars().count());
        if pad == 0 {
            return msg.to_string();
        }
        if self.flags.ident_right {
            format!("{msg}{}", " ".repeat(pad))
        } else {
            format!("{}{msg}", " ".repeat(pad))
        }
    }
}
