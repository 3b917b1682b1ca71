use humansize::{format_size, FormatSizeOptions, BINARY, DECIMAL};
use serde::Serialize;

pub const PER_SECOND: &str = "/s";

/// Size scaling applied to a speed before display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    None,
    KiB,
    KB,
}

/// A byte count rendered through humansize.
pub trait FormatSize {
    fn bytes(&self) -> u64;

    /// Unit scale to render with.
    fn options(&self) -> FormatSizeOptions;

    /// Written after the padded `number unit` text.
    fn suffix(&self) -> &'static str {
        ""
    }
}

/// Byte count scaled by powers of 1024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeB1024(pub i64);

/// Byte count scaled by powers of 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeB1000(pub i64);

/// Appends `/s` to any size value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerSecond<S>(pub S);

impl FormatSize for SizeB1024 {
    fn bytes(&self) -> u64 {
        self.0.max(0) as u64
    }

    fn options(&self) -> FormatSizeOptions {
        FormatSizeOptions::from(BINARY)
    }
}

impl FormatSize for SizeB1000 {
    fn bytes(&self) -> u64 {
        self.0.max(0) as u64
    }

    fn options(&self) -> FormatSizeOptions {
        FormatSizeOptions::from(DECIMAL)
    }
}

impl<S: FormatSize> FormatSize for PerSecond<S> {
    fn bytes(&self) -> u64 {
        self.0.bytes()
    }

    fn options(&self) -> FormatSizeOptions {
        self.0.options()
    }

    fn suffix(&self) -> &'static str {
        PER_SECOND
    }
}

/// Renders `number unit` without the suffix. `decimals` fixes the digit count;
/// `None` keeps humansize's default of two, dropped for whole numbers.
pub fn render_size(size: &impl FormatSize, decimals: Option<usize>, space: bool) -> String {
    let mut opts = size.options().space_after_value(true);
    if let Some(d) = decimals {
        opts = opts.decimal_places(d).decimal_zeroes(d);
    }
    let text = format_size(size.bytes(), opts);
    let (number, unit) = text.rsplit_once(' ').unwrap_or((text.as_str(), ""));
    let unit = match unit {
        "B" => "b",
        "kB" => "KB",
        other => other,
    };
    if space {
        format!("{number} {unit}")
    } else {
        format!("{number}{unit}")
    }
}
