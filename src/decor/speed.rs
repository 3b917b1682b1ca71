use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::decor::format::{FormatError, NumFormat};
use crate::decor::size::{PerSecond, SizeB1000, SizeB1024, Unit};
use crate::decor::{Decorator, Statistics, WidthConfig};
use crate::metrics::{new_moving_average, MovingAverage};

const DEFAULT_FORMAT: &str = "%.0f";

/// Renders `speed` per `unit`. Size units round to the nearest integer first
/// and always carry the `/s` suffix; plain numbers are formatted as they are.
pub fn format_speed(format: &NumFormat, unit: Unit, speed: f64) -> String {
    match unit {
        Unit::KiB => format.format_size(&PerSecond(SizeB1024(speed.round() as i64))),
        Unit::KB => format.format_size(&PerSecond(SizeB1000(speed.round() as i64))),
        Unit::None => format.format_number(speed),
    }
}

/// Formatting state shared by both speed decorators: the parsed format, the
/// last rendered message and the optional completion override.
#[derive(Debug)]
struct SpeedText {
    unit: Unit,
    fmt: String,
    format: Result<NumFormat, FormatError>,
    wc: WidthConfig,
    msg: String,
    complete_msg: Option<String>,
}

impl SpeedText {
    fn new(unit: Unit, fmt: &str, wc: Option<WidthConfig>) -> Self {
        let fmt = if fmt.is_empty() { DEFAULT_FORMAT } else { fmt };
        let format = NumFormat::parse(fmt);
        if let Err(e) = &format {
            warn!(error = %e, fmt, "Speed format is malformed, rendering it verbatim");
        }
        Self {
            unit,
            fmt: fmt.to_string(),
            format,
            wc: wc.unwrap_or_default(),
            msg: String::new(),
            complete_msg: None,
        }
    }

    fn frozen(&self) -> String {
        match &self.complete_msg {
            Some(msg) => self.wc.format_msg(msg),
            None => self.wc.format_msg(&self.msg),
        }
    }

    fn update(&mut self, speed: f64) -> String {
        self.msg = match &self.format {
            Ok(format) => format_speed(format, self.unit, speed),
            Err(_) => format!("%!(BADFMT {})", self.fmt),
        };
        self.wc.format_msg(&self.msg)
    }
}

/// Speed smoothed by a pluggable [`MovingAverage`].
///
/// Relies on the bar passing the duration of every increment to
/// [`Decorator::next_amount`]; increments without one are ignored.
///
/// With `unit` [`Unit::KiB`] the format `"%.1f"` renders `1.0MiB/s` and
/// `"% .1f"` renders `1.0 MiB/s`; [`Unit::KB`] gives `1.0MB/s` and `1.0 MB/s`.
/// An empty format means `"%.0f"`.
#[derive(Debug)]
pub struct MovingAverageSpeed<A> {
    text: SpeedText,
    average: A,
}

impl<A: MovingAverage> MovingAverageSpeed<A> {
    pub fn new(unit: Unit, fmt: &str, average: A, wc: Option<WidthConfig>) -> Self {
        Self { text: SpeedText::new(unit, fmt, wc), average }
    }
}

/// [`MovingAverageSpeed`] over an exponentially weighted average of the given age.
pub fn ewma_speed(
    unit: Unit,
    fmt: &str,
    age: f64,
    wc: Option<WidthConfig>,
) -> MovingAverageSpeed<Box<dyn MovingAverage + Send>> {
    MovingAverageSpeed::new(unit, fmt, new_moving_average(age), wc)
}

impl<A: MovingAverage + Send> Decorator for MovingAverageSpeed<A> {
    fn decor(&mut self, st: &Statistics) -> String {
        if st.completed {
            return self.text.frozen();
        }
        let speed = self.average.value();
        self.text.update(speed)
    }

    fn next_amount(&mut self, n: i64, work_duration: Option<Duration>) {
        let Some(work_duration) = work_duration else {
            trace!(n, "Increment without duration, skipping");
            return;
        };
        // The estimator is fed per-millisecond figures; AverageSpeed has no such factor.
        let speed = n as f64 / work_duration.as_secs_f64() / 1000.0;
        if !speed.is_finite() {
            trace!(n, ?work_duration, "Degenerate speed sample, skipping");
            return;
        }
        self.average.add(speed);
    }

    fn on_complete_message(&mut self, msg: String) {
        self.text.complete_msg = Some(msg);
    }
}

/// Cumulative speed: current progress over the time elapsed since `start`.
///
/// Formats like [`MovingAverageSpeed`]. The start can be moved with
/// [`Decorator::average_adjust`], e.g. to leave a pause out of the average.
#[derive(Debug)]
pub struct AverageSpeed {
    text: SpeedText,
    start: Instant,
}

impl AverageSpeed {
    pub fn new(unit: Unit, fmt: &str, wc: Option<WidthConfig>) -> Self {
        Self::with_start(unit, fmt, Instant::now(), wc)
    }

    pub fn with_start(unit: Unit, fmt: &str, start: Instant, wc: Option<WidthConfig>) -> Self {
        Self { text: SpeedText::new(unit, fmt, wc), start }
    }

    fn decor_at(&mut self, st: &Statistics, now: Instant) -> String {
        if st.completed {
            return self.text.frozen();
        }
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let mut speed = st.current as f64 / elapsed;
        if !speed.is_finite() {
            speed = 0.0;
        }
        self.text.update(speed)
    }
}

impl Decorator for AverageSpeed {
    fn decor(&mut self, st: &Statistics) -> String {
        self.decor_at(st, Instant::now())
    }

    fn on_complete_message(&mut self, msg: String) {
        self.text.complete_msg = Some(msg);
    }

    fn average_adjust(&mut self, start: Instant) {
        self.start = start;
    }
}
