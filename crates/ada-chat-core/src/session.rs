//! One chat session: transcript, composer and the pending-reply flag.
//!
//! Sending is split in two so a front end can run the request on its own
//! task: [`ChatSession::begin`] records the user turn and hands back the
//! request, [`ChatSession::complete`] applies whatever came back. The
//! [`ChatSession::submit`] helper does both around a [`ChatTransport`].
//!
//! A reply that arrives after [`ChatSession::stop`] is discarded.

use anyhow::Result;

use crate::ai::{ChatReply, ChatRequest, ChatTransport, GenerationOptions};
use crate::composer::{Composer, ExpandRules};
use crate::state::{ChatMessage, Transcript};

/// Shown in place of a reply with no content field.
pub const MISSING_REPLY_TEXT: &str = "No response";
/// Shown when the request fails for any reason.
pub const TRANSPORT_ERROR_TEXT: &str = "Error: failed to get response.";

/// Identifies one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub ticket: RequestTicket,
    pub request: ChatRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The reply (or error text) was appended at this transcript index.
    Applied(usize),
    /// The ticket was stale; nothing changed.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The gate was closed: empty text or a reply still pending.
    Rejected,
    Replied,
    Failed,
    /// Stopped while in flight; the reply was dropped.
    Discarded,
}

#[derive(Debug)]
pub struct ChatSession {
    transcript: Transcript,
    composer: Composer,
    options: GenerationOptions,
    awaiting_response: bool,
    next_ticket: u64,
    outstanding: Option<RequestTicket>,
}

impl ChatSession {
    pub fn new(options: GenerationOptions, rules: ExpandRules) -> Self {
        Self {
            transcript: Transcript::new(),
            composer: Composer::new(rules),
            options,
            awaiting_response: false,
            next_ticket: 0,
            outstanding: None,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    pub fn options(&self) -> GenerationOptions {
        self.options
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    /// Append the user turn and build the request for it.
    ///
    /// No gating here; callers that want the composer gate use
    /// [`ChatSession::submit_composer`].
    pub fn begin(&mut self, text: impl Into<String>) -> PendingRequest {
        self.transcript.push(ChatMessage::user(text));
        self.awaiting_response = true;

        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;
        self.outstanding = Some(ticket);

        let request = ChatRequest::new(self.transcript.messages().to_vec(), self.options);
        tracing::debug!(ticket = ticket.0, messages = request.messages.len(), "request started");
        PendingRequest { ticket, request }
    }

    /// Take the composer's text through the submission gate.
    pub fn submit_composer(&mut self) -> Option<PendingRequest> {
        let message = self.composer.submit(self.awaiting_response)?;
        Some(self.begin(message.content))
    }

    /// Apply the result of a request started with [`ChatSession::begin`].
    pub fn complete(&mut self, ticket: RequestTicket, result: Result<ChatReply>) -> Completion {
        if self.outstanding != Some(ticket) {
            tracing::warn!(ticket = ticket.0, "discarding reply for a stopped or superseded request");
            return Completion::Discarded;
        }

        let content = match result {
            Ok(reply) => reply.content.unwrap_or_else(|| MISSING_REPLY_TEXT.to_string()),
            Err(e) => {
                tracing::warn!(ticket = ticket.0, error = %e, "chat request failed");
                TRANSPORT_ERROR_TEXT.to_string()
            }
        };

        let index = self.transcript.push(ChatMessage::assistant(content));
        self.finish();
        Completion::Applied(index)
    }

    /// Stop waiting. The request keeps running; its reply will be discarded.
    pub fn stop(&mut self) {
        if let Some(ticket) = self.outstanding {
            tracing::info!(ticket = ticket.0, "stopped waiting for reply");
        }
        self.finish();
    }

    fn finish(&mut self) {
        self.outstanding = None;
        self.awaiting_response = false;
        self.composer.reset_layout();
    }

    /// Gate, send and apply in one call.
    pub async fn submit<T>(&mut self, transport: &T, text: &str) -> SubmitOutcome
    where
        T: ChatTransport + ?Sized,
    {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.awaiting_response {
            return SubmitOutcome::Rejected;
        }

        let pending = self.begin(trimmed);
        let result = transport.send(&pending.request).await;
        let failed = result.is_err();

        match self.complete(pending.ticket, result) {
            Completion::Discarded => SubmitOutcome::Discarded,
            Completion::Applied(_) if failed => SubmitOutcome::Failed,
            Completion::Applied(_) => SubmitOutcome::Replied,
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(GenerationOptions::default(), ExpandRules::default())
    }
}
