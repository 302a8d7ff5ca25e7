//! Terminal event handling using crossterm EventStream.

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;

/// High-level actions the TUI can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Action {
    Quit,
    Cancel,
    Interrupt,
    Submit(String),
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollToBottom,
    ToggleVimMode,
    ToggleSidebar,
    CopyLastResponse,
    OpenCommandPalette,
    Approve,
    ApproveAllSimilar,
    Deny,
    ShowDiff,
    ShowHelp,
    // Raw event passthrough
    RawEvent(RawEventData),
}

/// Minimal representation of a raw event for cases that need passthrough.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEventData {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

/// Reads terminal events asynchronously using crossterm's EventStream.
pub struct EventHandler {
    stream: EventStream,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            stream: EventStream::new(),
        }
    }

    /// Read the next terminal event. Returns None if the stream ends.
    pub async fn next(&mut self) -> Option<Event> {
        self.stream.next().await.and_then(|r| r.ok())
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a key event to an Action, given the current app mode.
/// Returns None if the event should be passed to the input widget.
pub fn map_global_key(event: &KeyEvent) -> Option<Action> {
    match (event.modifiers, event.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(Action::Interrupt),
        (KeyModifiers::CONTROL, KeyCode::Char('d')) => Some(Action::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('l')) => Some(Action::ScrollToBottom),
        _ => None,
    }
}

/// Map key events when in approval mode.
pub fn map_approval_key(event: &KeyEvent) -> Option<Action> {
    match event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => Some(Action::Approve),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::ApproveAllSimilar),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::Deny),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::ShowDiff),
        KeyCode::Char('?') => Some(Action::ShowHelp),
        KeyCode::Esc => Some(Action::Deny),
        _ => None,
    }
}
