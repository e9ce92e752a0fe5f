pub mod client;
pub mod transport;

pub use client::{ChatClient, HealthStatus, ModelInfo};
pub use transport::{ChatReply, ChatRequest, ChatTransport, GenerationOptions};
