// src/display/terminal.rs
//! Terminal-based display of a running session

use super::ControlKey;
use crate::{
    error::Result,
    tracking::{
        result::format_duration,
        session::{SessionSnapshot, SessionState},
    },
};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap},
};
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
    time::Duration,
};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::warn;

// Raw mode needs an explicit carriage return
const NEWLINE: &str = "\r\n";

pub struct TerminalDisplay {
    refresh: Duration,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self {
            refresh: Duration::from_millis(250),
        }
    }

    pub fn with_refresh(mut self, refresh: Duration) -> Self {
        self.refresh = refresh;
        self
    }

    /// Redraw the snapshot until `running` goes false
    pub async fn run(
        &self,
        snapshot: Arc<RwLock<SessionSnapshot>>,
        running: Arc<AtomicBool>,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(stdout, Hide, DisableLineWrap)?;

        let outcome = self.draw_loop(&mut stdout, &snapshot, &running).await;

        execute!(stdout, Show, EnableLineWrap)?;
        terminal::disable_raw_mode()?;
        outcome
    }

    async fn draw_loop(
        &self,
        stdout: &mut io::Stdout,
        snapshot: &RwLock<SessionSnapshot>,
        running: &AtomicBool,
    ) -> Result<()> {
        while running.load(Ordering::Relaxed) {
            execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

            let current = snapshot
                .read()
                .map(|snapshot| snapshot.clone())
                .unwrap_or_default();
            self.render_display(stdout, &current)?;

            stdout.flush()?;
            sleep(self.refresh).await;
        }
        Ok(())
    }

    /// Render one frame
    pub fn render_display(&self, out: &mut impl Write, snapshot: &SessionSnapshot) -> Result<()> {
        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print(NEWLINE),
            Print("Hike Tracker"),
            Print(NEWLINE),
            Print("=".repeat(60)),
            Print(NEWLINE),
            ResetColor
        )?;

        let started = match snapshot.started_at {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            None => "not started".to_string(),
        };
        execute!(
            out,
            Print("State: "),
            SetForegroundColor(state_color(snapshot.state)),
            Print(snapshot.state.to_string().to_uppercase()),
            ResetColor,
            Print(format!("   Started: {}{}{}", started, NEWLINE, NEWLINE))
        )?;

        self.render_progress_section(out, snapshot)?;
        self.render_position_section(out, snapshot)?;
        self.render_samples_section(out, snapshot)?;

        execute!(
            out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(60)),
            Print(NEWLINE),
            Print("[n] new  [p] pause  [r] resume  [s] stop  [x] reset  [q] quit"),
            Print(NEWLINE),
            ResetColor
        )?;

        Ok(())
    }

    fn render_progress_section(&self, out: &mut impl Write, snapshot: &SessionSnapshot) -> Result<()> {
        execute!(out, SetForegroundColor(Color::Yellow), Print("PROGRESS:"), Print(NEWLINE), ResetColor)?;

        let lines = [
            format!("  Elapsed:   {:>12}", format_duration(snapshot.elapsed_seconds)),
            format!("  Distance:  {:>12}", format_distance(snapshot.total_distance_m)),
            format!("  Ascent:    {:>10.1} m", snapshot.total_elevation_gain_m),
            format!("  Avg speed: {:>12}", format_speed(snapshot)),
        ];
        for line in lines {
            execute!(out, Print(line), Print(NEWLINE))?;
        }

        execute!(out, Print(NEWLINE))?;
        Ok(())
    }

    fn render_position_section(&self, out: &mut impl Write, snapshot: &SessionSnapshot) -> Result<()> {
        execute!(out, SetForegroundColor(Color::Cyan), Print("POSITION:"), Print(NEWLINE), ResetColor)?;

        let position = snapshot.current_position.as_ref();
        execute!(
            out,
            Print(format!("  Latitude:  {}{}", format_coordinate(position.map(|p| p.latitude)), NEWLINE)),
            Print(format!("  Longitude: {}{}", format_coordinate(position.map(|p| p.longitude)), NEWLINE)),
            Print(format!("  Altitude:  {}{}", format_value(position.and_then(|p| p.altitude), "m"), NEWLINE))
        )?;

        if let Some(acc) = position.and_then(|p| p.accuracy) {
            execute!(out, Print(format!("  Accuracy:  {:>12.1} m{}", acc, NEWLINE)))?;
        }

        execute!(out, Print(NEWLINE))?;
        Ok(())
    }

    fn render_samples_section(&self, out: &mut impl Write, snapshot: &SessionSnapshot) -> Result<()> {
        execute!(out, SetForegroundColor(Color::Magenta), Print("SAMPLES:"), Print(NEWLINE), ResetColor)?;

        execute!(
            out,
            Print(format!("  Accepted:  {:>12}{}", snapshot.accepted_samples, NEWLINE)),
            Print(format!("  Rejected:  {:>12}{}", snapshot.rejected_samples, NEWLINE)),
            Print(format!("  Path:      {:>12}{}{}", snapshot.path_len, NEWLINE, NEWLINE))
        )?;

        Ok(())
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

fn state_color(state: SessionState) -> Color {
    match state {
        SessionState::Idle => Color::Grey,
        SessionState::Tracking => Color::Green,
        SessionState::Paused => Color::Yellow,
        SessionState::Stopped => Color::Red,
    }
}

fn format_coordinate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:>12.6}°", v),
        None => format!("{:>12}", "No fix"),
    }
}

fn format_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:>10.1} {}", v, unit),
        None => format!("{:>12}", "N/A"),
    }
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

fn format_speed(snapshot: &SessionSnapshot) -> String {
    if snapshot.elapsed_seconds > 0.0 {
        format!("{:.1} km/h", snapshot.total_distance_m / snapshot.elapsed_seconds * 3.6)
    } else {
        "N/A".to_string()
    }
}

/// Read control keys on a blocking thread and forward them to `tx`.
///
/// Expects the terminal to be in raw mode, where Ctrl+C arrives as a key
/// press rather than a signal.
pub fn spawn_key_reader(tx: mpsc::Sender<ControlKey>, running: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while running.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(200)) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    warn!("Keyboard polling failed: {}", e);
                    break;
                }
            }

            let Ok(Event::Key(key)) = event::read() else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            let control = match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(ControlKey::Quit),
                KeyCode::Esc => Some(ControlKey::Quit),
                KeyCode::Char(c) => ControlKey::from_char(c),
                _ => None,
            };

            if let Some(control) = control {
                if tx.blocking_send(control).is_err() {
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::data::RawSample;
    use chrono::Utc;

    #[test]
    fn test_render_tracking_snapshot() {
        let snapshot = SessionSnapshot {
            state: SessionState::Tracking,
            started_at: Some(Utc::now()),
            elapsed_seconds: 3723.0,
            total_distance_m: 5230.0,
            total_elevation_gain_m: 412.5,
            current_position: Some(RawSample::new(46.5, 8.25, Utc::now()).with_accuracy(4.0)),
            path_len: 120,
            accepted_samples: 130,
            rejected_samples: 3,
        };

        let mut out = Vec::new();
        TerminalDisplay::new().render_display(&mut out, &snapshot).unwrap();
        let text = String::from_utf8_lossy(&out);

        assert!(text.contains("TRACKING"));
        assert!(text.contains("1h 2m 3s"));
        assert!(text.contains("5.23 km"));
        assert!(text.contains("412.5 m"));
        assert!(text.contains("46.500000°"));
        assert!(text.contains("Accuracy:"));
    }

    #[test]
    fn test_render_idle_snapshot() {
        let mut out = Vec::new();
        TerminalDisplay::new()
            .render_display(&mut out, &SessionSnapshot::default())
            .unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("IDLE"));
        assert!(text.contains("No fix"));
        assert!(!text.contains("Accuracy:"));
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1500.0), "1.50 km");
        assert_eq!(format_speed(&SessionSnapshot::default()), "N/A");
    }
}
