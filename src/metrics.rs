/// Age used by [`SimpleEwma`], in samples.
pub const AVG_METRIC_AGE: f64 = 30.0;

/// Samples a [`VariableEwma`] collects before it reports a value.
pub const WARMUP_SAMPLES: u8 = 10;

const DECAY: f64 = 2.0 / (AVG_METRIC_AGE + 1.0);

/// Smoothing estimator fed one observation at a time.
pub trait MovingAverage {
    fn add(&mut self, value: f64);
    fn value(&self) -> f64;
}

impl<A: MovingAverage + ?Sized> MovingAverage for Box<A> {
    fn add(&mut self, value: f64) {
        (**self).add(value)
    }

    fn value(&self) -> f64 {
        (**self).value()
    }
}

/// Exponentially weighted average with a fixed age of [`AVG_METRIC_AGE`] samples.
#[derive(Debug, Default, Clone)]
pub struct SimpleEwma {
    value: f64,
}

impl MovingAverage for SimpleEwma {
    fn add(&mut self, value: f64) {
        if self.value == 0.0 {
            // first sample seeds the average
            self.value = value;
        } else {
            self.value = value * DECAY + self.value * (1.0 - DECAY);
        }
    }

    fn value(&self) -> f64 {
        self.value
    }
}

/// Exponentially weighted average with a caller supplied age.
///
/// Reports 0 until more than [`WARMUP_SAMPLES`] observations were added; the
/// mean of the warm-up samples then seeds the average.
#[derive(Debug, Clone)]
pub struct VariableEwma {
    decay: f64,
    value: f64,
    count: u8,
}

impl VariableEwma {
    pub fn new(age: f64) -> Self {
        Self {
            decay: 2.0 / (age + 1.0),
            value: 0.0,
            count: 0,
        }
    }
}

impl MovingAverage for VariableEwma {
    fn add(&mut self, value: f64) {
        if self.count < WARMUP_SAMPLES {
            self.count += 1;
            self.value += value;
            return;
        }
        if self.count == WARMUP_SAMPLES {
            self.count += 1;
            self.value /= f64::from(WARMUP_SAMPLES);
        }
        self.value = value * self.decay + self.value * (1.0 - self.decay);
    }

    fn value(&self) -> f64 {
        if self.count <= WARMUP_SAMPLES {
            return 0.0;
        }
        self.value
    }
}

/// Picks [`SimpleEwma`] for the default age (0 or [`AVG_METRIC_AGE`]) and a
/// [`VariableEwma`] otherwise.
pub fn new_moving_average(age: f64) -> Box<dyn MovingAverage + Send> {
    if age == 0.0 || age == AVG_METRIC_AGE {
        Box::new(SimpleEwma::default())
    } else {
        Box::new(VariableEwma::new(age))
    }
}
