use ada_chat_core::{
    ChatClient, ChatReply, ChatRole, ChatSession, ChatTransport, Completion, Config, ExpandRules, HealthStatus, ModelInfo,
    RequestTicket, SegmentCache, SidebarController, SidebarState, ThoughtId, ThoughtOpenMap,
};
use anyhow::anyhow;
use ratatui::layout::Rect;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::metrics::TerminalMetrics;

/// Rows of slack below which the transcript still counts as "at the bottom".
const SCROLL_SLACK: u16 = 1;

/// Scroll position of the transcript, in wrapped rows.
///
/// While the view sits at the bottom, new content keeps it pinned there.
/// Once the user scrolls up it stays put and the renderer shows a
/// new-message indicator instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptScroll {
    pub offset: u16,
    pub viewport: u16,
    pub total: u16,
    pub scrolled_up: bool,
}

impl TranscriptScroll {
    pub fn max_offset(&self) -> u16 {
        self.total.saturating_sub(self.viewport)
    }

    /// Called by the renderer once the content height is known.
    pub fn update_layout(&mut self, total: u16, viewport: u16) {
        self.total = total;
        self.viewport = viewport;
        if self.scrolled_up {
            self.offset = self.offset.min(self.max_offset());
            self.recompute();
        } else {
            self.offset = self.max_offset();
        }
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.offset = self.offset.saturating_sub(rows);
        self.recompute();
    }

    pub fn scroll_down(&mut self, rows: u16) {
        self.offset = self.offset.saturating_add(rows).min(self.max_offset());
        self.recompute();
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
        self.recompute();
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
        self.scrolled_up = false;
    }

    fn recompute(&mut self) {
        self.scrolled_up = self.offset.saturating_add(self.viewport) < self.total.saturating_sub(SCROLL_SLACK);
    }
}

/// What we know about the backend, from the startup probe.
#[derive(Debug, Clone, Default)]
pub enum BackendStatus {
    #[default]
    Checking,
    Online {
        health: HealthStatus,
        models: Vec<ModelInfo>,
    },
    Offline(String),
}

/// A chat request running on its own task.
pub struct InFlight {
    pub ticket: RequestTicket,
    pub handle: JoinHandle<anyhow::Result<ChatReply>>,
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub session: ChatSession,
    pub thoughts: ThoughtOpenMap,
    pub segments: SegmentCache,
    pub scroll: TranscriptScroll,

    // Sidebar: the controller is the only writer, the renderer reads the watch
    pub sidebar: SidebarController,
    pub sidebar_layout: watch::Receiver<SidebarState>,
    pub hovering: bool,

    // Backend
    pub client: ChatClient,
    pub in_flight: Vec<InFlight>,
    pub backend: BackendStatus,
    backend_task: Option<JoinHandle<BackendStatus>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Composer inner width last used for the expand check
    pub composer_width: u16,

    // Areas for mouse hit-testing (updated during render)
    pub title_area: Option<Rect>,
    pub hamburger_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,
    pub transcript_area: Option<Rect>,
    pub send_area: Option<Rect>,
    pub indicator_area: Option<Rect>,
    pub thought_toggles: Vec<(Rect, ThoughtId)>,
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn hit(area: Option<Rect>, x: u16, y: u16) -> bool {
    area.map(|r| point_in_rect(x, y, r)).unwrap_or(false)
}

impl App {
    pub fn new(config: &Config) -> Self {
        let base_url = config.base_url();
        tracing::info!(%base_url, "starting chat session");

        let (layout_tx, sidebar_layout) = watch::channel(SidebarState::Hidden);
        let sidebar = SidebarController::new().with_observer(move |state| {
            // Receiver lives as long as the App; a send error only means shutdown
            let _ = layout_tx.send(state);
        });

        Self {
            should_quit: false,

            session: ChatSession::new(config.generation_options(), ExpandRules::CELLS),
            thoughts: ThoughtOpenMap::new(),
            segments: SegmentCache::new(),
            scroll: TranscriptScroll::default(),

            sidebar,
            sidebar_layout,
            hovering: false,

            client: ChatClient::new(&base_url),
            in_flight: Vec::new(),
            backend: BackendStatus::Checking,
            backend_task: None,

            animation_frame: 0,
            composer_width: 0,

            title_area: None,
            hamburger_area: None,
            sidebar_area: None,
            transcript_area: None,
            send_area: None,
            indicator_area: None,
            thought_toggles: Vec::new(),
        }
    }

    pub fn layout_state(&self) -> SidebarState {
        *self.sidebar_layout.borrow()
    }

    // Sending

    pub fn submit(&mut self) {
        let Some(pending) = self.session.submit_composer() else {
            return;
        };

        self.scroll.scroll_to_bottom();
        let client = self.client.clone();
        let request = pending.request;
        let handle = tokio::spawn(async move { client.send(&request).await });
        self.in_flight.push(InFlight {
            ticket: pending.ticket,
            handle,
        });
    }

    pub fn stop(&mut self) {
        if self.session.is_awaiting_response() {
            self.session.stop();
            self.refresh_composer_layout();
        }
    }

    /// Hand finished requests to the session. Stopped ones get discarded there.
    ///
    /// The session collapses the composer on completion; a draft typed while
    /// waiting gets re-measured so a multi-line draft stays expanded.
    pub async fn poll_replies(&mut self) {
        let mut index = 0;
        while index < self.in_flight.len() {
            if !self.in_flight[index].handle.is_finished() {
                index += 1;
                continue;
            }

            let InFlight { ticket, handle } = self.in_flight.swap_remove(index);
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(anyhow!("chat task failed: {}", e)),
            };
            if let Completion::Applied(_) = self.session.complete(ticket, result) {
                self.refresh_composer_layout();
            }
        }
    }

    // Backend probe

    pub fn probe_backend(&mut self) {
        let client = self.client.clone();
        self.backend = BackendStatus::Checking;
        self.backend_task = Some(tokio::spawn(async move {
            let health = match client.health().await {
                Ok(health) => health,
                Err(e) => {
                    tracing::warn!(error = %e, url = client.base_url(), "backend health check failed");
                    return BackendStatus::Offline(e.to_string());
                }
            };
            let models = client.list_models().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not list models");
                Vec::new()
            });
            BackendStatus::Online { health, models }
        }));
    }

    pub async fn poll_backend(&mut self) {
        if !self.backend_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        if let Some(task) = self.backend_task.take() {
            self.backend = match task.await {
                Ok(status) => status,
                Err(e) => BackendStatus::Offline(e.to_string()),
            };
        }
    }

    // Sidebar

    pub fn toggle_sidebar(&mut self) {
        self.sidebar.click();
    }

    /// Pointer moved; fire hover enter/leave on boundary crossings only.
    pub fn pointer_moved(&mut self, x: u16, y: u16) {
        let inside = hit(self.title_area, x, y) || hit(self.sidebar_area, x, y);
        if inside == self.hovering {
            return;
        }
        self.hovering = inside;
        if inside {
            self.sidebar.hover_enter();
        } else {
            self.sidebar.hover_leave();
        }
    }

    // Mouse clicks

    pub fn click(&mut self, x: u16, y: u16) {
        if hit(self.hamburger_area, x, y) {
            self.toggle_sidebar();
        } else if hit(self.send_area, x, y) {
            if self.session.is_awaiting_response() {
                self.stop();
            } else {
                self.submit();
            }
        } else if hit(self.indicator_area, x, y) {
            self.scroll.scroll_to_bottom();
        } else if let Some(id) = self
            .thought_toggles
            .iter()
            .find(|(rect, _)| point_in_rect(x, y, *rect))
            .map(|(_, id)| *id)
        {
            self.thoughts.toggle(id);
        }
    }

    pub fn in_transcript(&self, x: u16, y: u16) -> bool {
        hit(self.transcript_area, x, y)
    }

    // Thoughts

    /// Toggle the last thought of the newest assistant message that has one.
    pub fn toggle_latest_thought(&mut self) {
        let transcript = self.session.transcript();
        let latest = transcript
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, message)| message.role == ChatRole::Assistant)
            .find_map(|(index, message)| {
                self.segments
                    .segments(index, message)
                    .iter()
                    .rev()
                    .find_map(|segment| segment.id)
            });

        if let Some(id) = latest {
            self.thoughts.toggle(id);
        }
    }

    // Composer

    /// Re-run the expand check after any edit or resize.
    pub fn refresh_composer_layout(&mut self) {
        let width = self.composer_width as f32;
        self.session
            .composer_mut()
            .evaluate_expanded(&TerminalMetrics, width);
    }

    pub fn tick_animation(&mut self) {
        if self.session.is_awaiting_response() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ada_chat_core::ChatMessage;

    #[test]
    fn test_scroll_follows_bottom_until_scrolled_up() {
        let mut scroll = TranscriptScroll::default();
        scroll.update_layout(30, 10);
        assert_eq!(scroll.offset, 20);
        assert!(!scroll.scrolled_up);

        scroll.update_layout(35, 10);
        assert_eq!(scroll.offset, 25);

        scroll.scroll_up(5);
        assert!(scroll.scrolled_up);
        scroll.update_layout(50, 10);
        assert_eq!(scroll.offset, 20);
        assert!(scroll.scrolled_up);

        scroll.scroll_to_bottom();
        assert!(!scroll.scrolled_up);
        assert_eq!(scroll.offset, 40);
    }

    #[test]
    fn test_one_row_up_still_counts_as_bottom() {
        let mut scroll = TranscriptScroll::default();
        scroll.update_layout(30, 10);
        scroll.scroll_up(1);
        assert!(!scroll.scrolled_up);
        scroll.scroll_up(1);
        assert!(scroll.scrolled_up);
        scroll.scroll_down(100);
        assert_eq!(scroll.offset, 20);
        assert!(!scroll.scrolled_up);
    }

    #[test]
    fn test_short_content_is_never_scrolled_up() {
        let mut scroll = TranscriptScroll::default();
        scroll.update_layout(5, 10);
        scroll.scroll_up(3);
        assert_eq!(scroll.offset, 0);
        assert!(!scroll.scrolled_up);
    }

    #[test]
    fn test_hover_only_fires_on_crossings() {
        let mut app = App::new(&Config::new());
        app.title_area = Some(Rect::new(0, 0, 20, 1));

        app.pointer_moved(5, 0);
        assert_eq!(app.layout_state(), SidebarState::Visible);
        assert!(app.sidebar_layout.has_changed().unwrap());

        app.pointer_moved(40, 10);
        assert_eq!(app.layout_state(), SidebarState::Hidden);

        app.toggle_sidebar();
        app.toggle_sidebar();
        app.pointer_moved(5, 0);
        app.pointer_moved(40, 10);
        assert_eq!(app.layout_state(), SidebarState::Pinned);
    }

    #[test]
    fn test_click_hits_thought_toggle() {
        let mut app = App::new(&Config::new());
        let id = ThoughtId { message: 1, offset: 0 };
        app.thought_toggles = vec![(Rect::new(0, 4, 30, 1), id)];

        app.click(3, 4);
        assert!(app.thoughts.is_open(id));
        app.click(3, 5);
        assert!(app.thoughts.is_open(id));
        app.click(3, 4);
        assert!(!app.thoughts.is_open(id));
    }

    #[test]
    fn test_toggle_latest_thought_picks_newest() {
        let mut app = App::new(&Config::new());
        let pending = app.session.begin("q1");
        app.session
            .complete(pending.ticket, Ok(ChatReply::text("<think>a</think>one")));
        let pending = app.session.begin("q2");
        app.session
            .complete(pending.ticket, Ok(ChatReply::text("two <think>b</think><think>c</think>")));
        let pending = app.session.begin("q3");
        app.session.complete(pending.ticket, Ok(ChatReply::text("no thoughts")));

        app.toggle_latest_thought();
        assert!(app.thoughts.is_open(ThoughtId { message: 3, offset: 20 }));
        assert!(!app.thoughts.is_open(ThoughtId { message: 3, offset: 4 }));
        assert_eq!(
            app.session.transcript().get(5),
            Some(&ChatMessage::assistant("no thoughts"))
        );
    }

    #[tokio::test]
    async fn test_draft_typed_while_waiting_stays_expanded() {
        let mut app = App::new(&Config::new());
        app.composer_width = 40;
        let pending = app.session.begin("first");
        let handle = tokio::spawn(async { Ok::<_, anyhow::Error>(ChatReply::text("reply")) });
        app.in_flight.push(InFlight { ticket: pending.ticket, handle });

        app.session.composer_mut().set_text("next\nquestion");
        app.refresh_composer_layout();
        assert!(app.session.composer().is_expanded());

        while !app.in_flight[0].handle.is_finished() {
            tokio::task::yield_now().await;
        }
        app.poll_replies().await;

        assert!(app.in_flight.is_empty());
        assert!(!app.session.is_awaiting_response());
        assert_eq!(app.session.transcript().len(), 2);
        assert!(app.session.composer().is_expanded());
    }

    #[test]
    fn test_typing_newline_expands_composer() {
        let mut app = App::new(&Config::new());
        app.composer_width = 40;
        app.session.composer_mut().set_text("hello");
        app.refresh_composer_layout();
        assert!(!app.session.composer().is_expanded());

        app.session.composer_mut().insert_newline();
        app.refresh_composer_layout();
        assert!(app.session.composer().is_expanded());
    }
}
