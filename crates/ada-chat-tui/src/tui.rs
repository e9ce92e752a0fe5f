//! Terminal setup and the input/tick event source.

use std::io::{self, Stderr};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
        EventStream, KeyEvent, KeyEventKind, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::time::{Interval, MissedTickBehavior};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

/// Animation step for the "Thinking..." ellipsis; also how often finished
/// requests get picked up when the user is idle.
const TICK_RATE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Paste(String),
    Resize(u16, u16),
    Tick,
}

/// Map a raw terminal event to something the app reacts to.
fn translate(event: Event) -> Option<AppEvent> {
    match event {
        // Releases and repeats arrive on terminals with keyboard enhancement
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Mouse(mouse) => Some(AppEvent::Mouse(mouse)),
        Event::Paste(text) => Some(AppEvent::Paste(text)),
        Event::Resize(w, h) => Some(AppEvent::Resize(w, h)),
        _ => None,
    }
}

/// Merges terminal input and the animation tick into one stream.
pub struct EventHandler {
    input: EventStream,
    tick: Interval,
}

impl EventHandler {
    pub fn new() -> Self {
        let mut tick = tokio::time::interval(TICK_RATE);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self {
            input: EventStream::new(),
            tick,
        }
    }

    /// Next event, or `None` once the terminal input closes.
    pub async fn next(&mut self) -> Option<AppEvent> {
        loop {
            tokio::select! {
                biased; // input before ticks when both are ready

                maybe_event = self.input.next() => match maybe_event {
                    Some(Ok(event)) => {
                        if let Some(event) = translate(event) {
                            return Some(event);
                        }
                    }
                    Some(Err(e)) => tracing::warn!(error = %e, "terminal event stream error"),
                    None => return None,
                },
                _ = self.tick.tick() => return Some(AppEvent::Tick),
            }
        }
    }
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(
        io::stderr(),
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;

    Ok(Terminal::new(CrosstermBackend::new(io::stderr()))?)
}

pub fn restore() -> Result<()> {
    execute!(
        io::stderr(),
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    disable_raw_mode()?;
    Ok(())
}

/// Leave the alternate screen before the panic message prints.
pub fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = restore();
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers, MouseEventKind};

    fn key(kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_only_key_presses_pass() {
        assert!(matches!(translate(key(KeyEventKind::Press)), Some(AppEvent::Key(_))));
        assert_eq!(translate(key(KeyEventKind::Release)), None);
        assert_eq!(translate(key(KeyEventKind::Repeat)), None);
    }

    #[test]
    fn test_mouse_paste_and_resize_pass_through() {
        let mouse = MouseEvent {
            kind: MouseEventKind::Moved,
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(translate(Event::Mouse(mouse)), Some(AppEvent::Mouse(mouse)));
        assert_eq!(
            translate(Event::Paste("a\nb".to_string())),
            Some(AppEvent::Paste("a\nb".to_string()))
        );
        assert_eq!(translate(Event::Resize(80, 24)), Some(AppEvent::Resize(80, 24)));
    }

    #[test]
    fn test_focus_events_are_ignored() {
        assert_eq!(translate(Event::FocusGained), None);
        assert_eq!(translate(Event::FocusLost), None);
    }
}
