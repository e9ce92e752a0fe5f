//! Sidebar visibility: hidden, visible (hover or first click), pinned.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SidebarState {
    #[default]
    Hidden,
    Visible,
    Pinned,
}

impl SidebarState {
    /// Layout label consumed by the renderer.
    pub fn as_str(&self) -> &'static str {
        match self {
            SidebarState::Hidden => "hidden",
            SidebarState::Visible => "visible",
            SidebarState::Pinned => "pinned",
        }
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, SidebarState::Hidden)
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, SidebarState::Pinned)
    }

    /// Next state for an event. Every (state, event) pair is defined.
    pub fn next(self, event: SidebarEvent) -> SidebarState {
        match (self, event) {
            (SidebarState::Hidden, SidebarEvent::Click) => SidebarState::Visible,
            (SidebarState::Visible, SidebarEvent::Click) => SidebarState::Pinned,
            (SidebarState::Pinned, SidebarEvent::Click) => SidebarState::Hidden,
            // Pinning suppresses hover entirely
            (SidebarState::Pinned, _) => SidebarState::Pinned,
            (_, SidebarEvent::HoverEnter) => SidebarState::Visible,
            (_, SidebarEvent::HoverLeave) => SidebarState::Hidden,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarEvent {
    /// Hamburger toggle.
    Click,
    HoverEnter,
    HoverLeave,
}

type Observer = Box<dyn FnMut(SidebarState) + Send>;

/// Sole owner of the sidebar state. Observers hear about every change.
#[derive(Default)]
pub struct SidebarController {
    state: SidebarState,
    observer: Option<Observer>,
}

impl SidebarController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer that drives layout. Replaces any previous one.
    pub fn with_observer(mut self, observer: impl FnMut(SidebarState) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> SidebarState {
        self.state
    }

    pub fn handle(&mut self, event: SidebarEvent) -> SidebarState {
        let next = self.state.next(event);
        if next != self.state {
            tracing::debug!(from = self.state.as_str(), to = next.as_str(), ?event, "sidebar transition");
            self.state = next;
            if let Some(observer) = self.observer.as_mut() {
                observer(next);
            }
        }
        self.state
    }

    pub fn click(&mut self) -> SidebarState {
        self.handle(SidebarEvent::Click)
    }

    pub fn hover_enter(&mut self) -> SidebarState {
        self.handle(SidebarEvent::HoverEnter)
    }

    pub fn hover_leave(&mut self) -> SidebarState {
        self.handle(SidebarEvent::HoverLeave)
    }
}

impl std::fmt::Debug for SidebarController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidebarController")
            .field("state", &self.state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_click_cycle_returns_to_hidden() {
        let mut sidebar = SidebarController::new();
        assert_eq!(sidebar.state(), SidebarState::Hidden);
        assert_eq!(sidebar.click(), SidebarState::Visible);
        assert_eq!(sidebar.click(), SidebarState::Pinned);
        assert!(sidebar.state().is_visible());
        assert_eq!(sidebar.click(), SidebarState::Hidden);
    }

    #[test]
    fn test_pinned_ignores_hover() {
        let mut sidebar = SidebarController::new();
        sidebar.click();
        sidebar.click();
        assert_eq!(sidebar.hover_leave(), SidebarState::Pinned);
        assert_eq!(sidebar.hover_enter(), SidebarState::Pinned);
    }

    #[test]
    fn test_hover_shows_and_hides() {
        let mut sidebar = SidebarController::new();
        assert_eq!(sidebar.hover_enter(), SidebarState::Visible);
        assert_eq!(sidebar.hover_leave(), SidebarState::Hidden);

        // Clicked open, then the pointer leaves: hover still collapses it
        sidebar.click();
        assert_eq!(sidebar.hover_leave(), SidebarState::Hidden);
    }

    #[test]
    fn test_hover_then_click_pins() {
        let mut sidebar = SidebarController::new();
        sidebar.hover_enter();
        assert_eq!(sidebar.click(), SidebarState::Pinned);
        assert_eq!(sidebar.hover_leave(), SidebarState::Pinned);
    }

    #[test]
    fn test_transition_table_is_total() {
        let states = [SidebarState::Hidden, SidebarState::Visible, SidebarState::Pinned];
        let events = [SidebarEvent::Click, SidebarEvent::HoverEnter, SidebarEvent::HoverLeave];
        for state in states {
            for event in events {
                let next = state.next(event);
                assert!(states.contains(&next));
            }
        }
    }

    #[test]
    fn test_observer_hears_changes_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut sidebar = SidebarController::new()
            .with_observer(move |state| sink.lock().unwrap().push(state.as_str()));

        sidebar.hover_enter();
        sidebar.hover_enter();
        sidebar.click();
        sidebar.hover_leave();
        sidebar.click();

        assert_eq!(*seen.lock().unwrap(), vec!["visible", "pinned", "hidden"]);
    }
}
