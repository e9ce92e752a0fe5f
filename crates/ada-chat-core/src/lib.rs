pub mod ai;
pub mod composer;
pub mod config;
pub mod session;
pub mod sidebar;
pub mod state;
pub mod think;

// Re-export main types for convenience
pub use ai::{ChatClient, ChatReply, ChatRequest, ChatTransport, GenerationOptions, HealthStatus, ModelInfo};
pub use composer::{Composer, ExpandRules, TextMetrics};
pub use config::Config;
pub use session::{ChatSession, Completion, PendingRequest, RequestTicket, SubmitOutcome};
pub use sidebar::{SidebarController, SidebarEvent, SidebarState};
pub use state::{ChatMessage, ChatRole, Transcript};
pub use think::{parse_segments, Segment, SegmentCache, SegmentKind, ThoughtId, ThoughtOpenMap};
