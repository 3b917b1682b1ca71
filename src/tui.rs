use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event as TermEvent, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Terminal,
};

use crate::sim::{apply, Bar, Event};

const MAX_LOGS: usize = 100;

pub fn run_tui(bar: &mut Bar, events: Receiver<Event>, stop: Arc<AtomicBool>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut logs: Vec<String> = Vec::new();
    let mut done = false;

    while !stop.load(Ordering::Relaxed) {
        while let Ok(ev) = events.try_recv() {
            // progress events arrive every few ms, only the rare ones are worth a line
            if !matches!(ev, Event::Progress { .. }) {
                logs.push(ev.to_string());
                if logs.len() > MAX_LOGS {
                    logs.remove(0);
                }
            }
            done |= apply(bar, ev);
        }

        let ratio = bar.ratio();
        let decorations = bar.decorations();
        let st = bar.statistics();

        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)].as_ref())
                .split(f.size());

            let gauge = Gauge::default()
                .block(Block::default().title("Progress").borders(Borders::ALL))
                .ratio(ratio)
                .label(format!("{}/{}", st.current, st.total));
            f.render_widget(gauge, chunks[0]);

            let title = if done { "Speed (done, q to quit)" } else { "Speed (ewma / average)" };
            let speed = Paragraph::new(decorations.clone())
                .block(Block::default().title(title).borders(Borders::ALL));
            f.render_widget(speed, chunks[1]);

            let log_items: Vec<ListItem> = logs.iter().rev().map(|l| ListItem::new(l.clone())).collect();
            let log_list = List::new(log_items).block(Block::default().title("Events").borders(Borders::ALL));
            f.render_widget(log_list, chunks[2]);
        })?;

        if event::poll(Duration::from_millis(150))? {
            if let TermEvent::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q')
                    || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    stop.store(true, Ordering::Relaxed);
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
