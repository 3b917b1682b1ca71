use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{self as channel, RecvTimeoutError};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::Simulate;
use crate::decor::{ewma_speed, AverageSpeed, Decorator, Statistics, Unit};

const TICK: Duration = Duration::from_millis(150);
const GAUGE_WIDTH: usize = 30;

/// Progress reported by the worker to the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Progress { n: i64, took: Duration },
    Paused,
    Resumed { paused: Duration },
    Done,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Progress { n, took } => write!(f, "+{n} in {}ms", took.as_millis()),
            Event::Paused => write!(f, "paused"),
            Event::Resumed { paused } => write!(f, "resumed after {}ms", paused.as_millis()),
            Event::Done => write!(f, "done"),
        }
    }
}

/// Minimal bar: tracks progress and hands snapshots to its decorators.
pub struct Bar {
    total: i64,
    current: i64,
    started: Instant,
    decorators: Vec<Box<dyn Decorator>>,
}

impl Bar {
    pub fn new(total: i64) -> Self {
        Self {
            total,
            current: 0,
            started: Instant::now(),
            decorators: Vec::new(),
        }
    }

    pub fn push(&mut self, decorator: impl Decorator + 'static) {
        self.decorators.push(Box::new(decorator));
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            total: self.total,
            current: self.current,
            completed: self.current >= self.total,
        }
    }

    pub fn incr_by(&mut self, n: i64, took: Option<Duration>) {
        self.current = (self.current + n).min(self.total);
        for d in &mut self.decorators {
            d.next_amount(n, took);
        }
    }

    pub fn set_complete_message(&mut self, msg: &str) {
        for d in &mut self.decorators {
            d.on_complete_message(msg.to_string());
        }
    }

    /// Leaves `paused` out of every time based average.
    pub fn shift_start(&mut self, paused: Duration) {
        self.started += paused;
        for d in &mut self.decorators {
            d.average_adjust(self.started);
        }
    }

    pub fn decorations(&mut self) -> String {
        let st = self.statistics();
        self.decorators
            .iter_mut()
            .map(|d| d.decor(&st))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn ratio(&self) -> f64 {
        if self.total <= 0 {
            return 1.0;
        }
        (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
    }

    pub fn render(&mut self) -> String {
        let gauge = gauge(self.ratio(), GAUGE_WIDTH);
        let decorations = self.decorations();
        format!("{gauge} {}/{} {decorations}", self.current, self.total)
    }
}

fn gauge(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64) as usize).min(width);
    let mut bar = "=".repeat(filled);
    if filled > 0 && filled < width {
        bar.pop();
        bar.push('>');
    }
    format!("[{bar}{}]", " ".repeat(width - filled))
}

/// Applies one worker event. Returns true once the worker is done.
pub(crate) fn apply(bar: &mut Bar, event: Event) -> bool {
    match event {
        Event::Progress { n, took } => bar.incr_by(n, Some(took)),
        Event::Paused => info!("Worker paused"),
        Event::Resumed { paused } => {
            info!(paused_ms = paused.as_millis() as u64, "Worker resumed, adjusting average");
            bar.shift_start(paused);
        }
        Event::Done => return true,
    }
    false
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub unit: Unit,
    pub statistics: Statistics,
    pub rendered: String,
}

pub fn build_bar(sim: &Simulate) -> Bar {
    let unit = Unit::from(sim.unit);
    let wc = Some(sim.width_config());
    let mut bar = Bar::new(sim.total);
    bar.push(ewma_speed(unit, &sim.format, sim.age, wc));
    bar.push(AverageSpeed::new(unit, &sim.format, wc));
    if let Some(msg) = &sim.complete_msg {
        bar.set_complete_message(msg);
    }
    bar
}

fn spawn_worker(sim: &Simulate, tx: channel::Sender<Event>, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    let total = sim.total;
    let chunk = sim.chunk.max(1);
    let delay = Duration::from_millis(sim.delay_ms);
    let jitter = Duration::from_millis(sim.jitter_ms);
    let pause_after = sim.pause_after;
    let pause = Duration::from_millis(sim.pause_ms);

    thread::spawn(move || {
        let mut sent = 0i64;
        let mut step = 0u64;
        while sent < total && !stop.load(Ordering::Relaxed) {
            if pause_after == Some(step) {
                let paused_at = Instant::now();
                if tx.send(Event::Paused).is_err() {
                    return;
                }
                thread::sleep(pause);
                let paused = paused_at.elapsed();
                if tx.send(Event::Resumed { paused }).is_err() {
                    return;
                }
            }

            let began = Instant::now();
            thread::sleep(if step % 3 == 2 { delay + jitter } else { delay });
            let n = chunk.min(total - sent);
            sent += n;
            step += 1;
            if tx.send(Event::Progress { n, took: began.elapsed() }).is_err() {
                return;
            }
        }
        let _ = tx.send(Event::Done);
    })
}

pub fn run_simulate(sim: Simulate, stop: Arc<AtomicBool>) -> Result<Report> {
    let mut bar = build_bar(&sim);
    info!(total = sim.total, chunk = sim.chunk, unit = ?Unit::from(sim.unit), format = %sim.format, "Starting simulation");

    let (tx, rx) = channel::unbounded::<Event>();
    let worker = spawn_worker(&sim, tx, stop.clone());

    if sim.tui {
        crate::tui::run_tui(&mut bar, rx, stop.clone())?;
    } else {
        let mut last_draw = Instant::now();
        while !stop.load(Ordering::Relaxed) {
            let done = match rx.recv_timeout(TICK) {
                Ok(event) => {
                    debug!(%event, "Event");
                    apply(&mut bar, event)
                }
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => true,
            };
            if done {
                break;
            }
            if last_draw.elapsed() >= TICK {
                eprint!("\r{}", bar.render());
                last_draw = Instant::now();
            }
        }
        eprintln!("\r{}", bar.render());
    }

    // releases the worker when the render loop was interrupted
    stop.store(true, Ordering::Relaxed);
    let _ = worker.join();

    let report = Report {
        unit: Unit::from(sim.unit),
        statistics: bar.statistics(),
        rendered: bar.decorations(),
    };
    info!(completed = report.statistics.completed, "Simulation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::cli::UnitOpt;

    #[derive(Clone, Default)]
    struct Spy {
        amounts: Arc<Mutex<Vec<(i64, Option<Duration>)>>>,
        starts: Arc<Mutex<Vec<Instant>>>,
    }

    impl Decorator for Spy {
        fn decor(&mut self, st: &Statistics) -> String {
            format!("{}/{}", st.current, st.total)
        }

        fn next_amount(&mut self, n: i64, work_duration: Option<Duration>) {
            self.amounts.lock().unwrap().push((n, work_duration));
        }

        fn average_adjust(&mut self, start: Instant) {
            self.starts.lock().unwrap().push(start);
        }
    }

    fn simulate(total: i64, chunk: i64) -> Simulate {
        Simulate {
            total,
            chunk,
            delay_ms: 1,
            jitter_ms: 0,
            unit: UnitOpt::None,
            format: "%.0f".into(),
            age: 0.0,
            width: 0,
            ident_right: false,
            extra_space: false,
            complete_msg: Some("done".into()),
            pause_after: None,
            pause_ms: 0,
            tui: false,
            json: false,
        }
    }

    #[test]
    fn incr_by_clamps_and_completes() {
        let mut bar = Bar::new(10);
        bar.incr_by(4, None);
        assert!(!bar.statistics().completed);
        bar.incr_by(20, None);
        assert_eq!(bar.statistics(), Statistics { total: 10, current: 10, completed: true });
    }

    #[test]
    fn events_are_forwarded_to_decorators() {
        let spy = Spy::default();
        let mut bar = Bar::new(10);
        bar.push(spy.clone());
        let took = Duration::from_millis(5);
        assert!(!apply(&mut bar, Event::Progress { n: 3, took }));
        assert!(!apply(&mut bar, Event::Resumed { paused: Duration::from_secs(1) }));
        assert!(apply(&mut bar, Event::Done));

        assert_eq!(*spy.amounts.lock().unwrap(), vec![(3, Some(took))]);
        assert_eq!(*spy.starts.lock().unwrap(), vec![bar.started]);
        assert_eq!(bar.decorations(), "3/10");
    }

    #[test]
    fn gauge_shapes() {
        assert_eq!(gauge(0.0, 4), "[    ]");
        assert_eq!(gauge(0.5, 4), "[=>  ]");
        assert_eq!(gauge(1.0, 4), "[====]");
    }

    #[test]
    fn completed_bar_shows_complete_message() {
        let sim = simulate(10, 10);
        let mut bar = build_bar(&sim);
        bar.incr_by(10, Some(Duration::from_millis(10)));
        assert_eq!(bar.decorations(), "done done");
    }

    #[test]
    fn simulation_runs_to_completion() {
        let stop = Arc::new(AtomicBool::new(false));
        let report = run_simulate(simulate(100, 10), stop).unwrap();
        assert!(report.statistics.completed);
        assert_eq!(report.statistics.current, 100);
        assert_eq!(report.rendered, "done done");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["unit"], "none");
        assert_eq!(json["statistics"]["completed"], true);
    }

    #[test]
    fn pause_moves_the_average_start() {
        let stop = Arc::new(AtomicBool::new(false));
        let mut sim = simulate(20, 10);
        sim.pause_after = Some(1);
        sim.pause_ms = 5;
        let report = run_simulate(sim, stop).unwrap();
        assert!(report.statistics.completed);
    }
}
