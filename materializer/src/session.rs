//! Conversation driver for one generation session.
//!
//! A session owns the conversation history and the rate-limit governor. Each
//! exchange is split into `begin_*` (validate, snapshot the request, mark the
//! session in flight) and [`GenerationSession::complete`] (fold the reply back
//! in). Drivers that perform the exchange elsewhere hold the
//! [`ExchangeTicket`] in between and must hand it back through `complete` or
//! [`GenerationSession::abandon`]; [`GenerationSession::start`] and
//! [`GenerationSession::send_follow_up`] drive a [`Backend`] directly.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::decoder::{ArtifactDecoder, StepDecoder};
use crate::core::rate_limit::{Clock, RateLimitGovernor, RateLimitState, SystemClock};
use crate::core::types::{Message, Step};
use crate::io::backend::{Backend, ExchangeError};

/// Signals surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session busy: an exchange is already in flight")]
    Busy,
    #[error("rate limited: retry in {remaining_secs}s")]
    Limited { remaining_secs: u64 },
    #[error("message is empty")]
    EmptyMessage,
    #[error("backend throttled the request: retry in {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },
    #[error("backend exchange failed: {0}")]
    Backend(String),
}

/// An outstanding exchange issued by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeTicket {
    generation: u64,
    request: Vec<Message>,
    pending: Vec<Message>,
}

impl ExchangeTicket {
    /// Full conversation to send to the backend.
    pub fn request(&self) -> &[Message] {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of completing a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Newly decoded pending steps.
    Steps(Vec<Step>),
    /// The ticket belonged to a session generation that has since been replaced.
    Discarded,
}

pub struct GenerationSession<D = ArtifactDecoder, C = SystemClock> {
    decoder: D,
    clock: C,
    history: Vec<Message>,
    governor: RateLimitGovernor,
    in_flight: bool,
    generation: u64,
    next_step_id: u32,
}

impl GenerationSession {
    pub fn with_defaults(default_retry_after_secs: u64) -> Self {
        Self::new(ArtifactDecoder, SystemClock::new(), default_retry_after_secs)
    }
}

impl<D: StepDecoder, C: Clock> GenerationSession<D, C> {
    pub fn new(decoder: D, clock: C, default_retry_after_secs: u64) -> Self {
        Self {
            decoder,
            clock,
            history: Vec::new(),
            governor: RateLimitGovernor::new(default_retry_after_secs),
            in_flight: false,
            generation: 0,
            next_step_id: 1,
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Current limited/idle state; releases an expired countdown.
    pub fn rate_limit(&mut self) -> RateLimitState {
        self.governor.poll(self.clock.now())
    }

    /// Tear down the current conversation and begin a new generation.
    ///
    /// Outstanding tickets become stale and any countdown is cancelled.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.history.clear();
        self.governor.reset();
        self.in_flight = false;
        self.next_step_id = 1;
        debug!(generation = self.generation, "session reset");
    }

    /// Decode `raw` into pending steps with session-unique ids.
    pub fn decode(&mut self, raw: &str) -> Vec<Step> {
        let steps = self.decoder.decode(raw, self.next_step_id);
        if let Some(max_id) = steps.iter().map(|step| step.id).max() {
            self.next_step_id = self.next_step_id.max(max_id + 1);
        }
        steps
    }

    /// Start a fresh conversation with `preamble` context messages followed by `prompt`.
    pub fn begin_start(
        &mut self,
        prompt: &str,
        preamble: &[String],
    ) -> Result<ExchangeTicket, SessionError> {
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.reset();
        let pending: Vec<Message> = preamble
            .iter()
            .map(|content| Message::user(content.as_str()))
            .chain(std::iter::once(Message::user(prompt.trim())))
            .collect();
        Ok(self.issue(pending))
    }

    /// Queue a follow-up message behind the existing history.
    pub fn begin_follow_up(&mut self, text: &str) -> Result<ExchangeTicket, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.in_flight {
            return Err(SessionError::Busy);
        }
        if let RateLimitState::Limited { remaining_secs } = self.rate_limit() {
            debug!(remaining_secs, "follow-up rejected while limited");
            return Err(SessionError::Limited { remaining_secs });
        }
        Ok(self.issue(vec![Message::user(text)]))
    }

    fn issue(&mut self, pending: Vec<Message>) -> ExchangeTicket {
        self.in_flight = true;
        let mut request = self.history.clone();
        request.extend(pending.iter().cloned());
        ExchangeTicket {
            generation: self.generation,
            request,
            pending,
        }
    }

    /// Fold an exchange result back into the session.
    ///
    /// On success the ticket's messages and the raw reply are appended to the
    /// history and the decoded steps are returned. On failure history is left
    /// untouched. Tickets from an earlier generation are discarded.
    pub fn complete(
        &mut self,
        ticket: ExchangeTicket,
        result: Result<String, ExchangeError>,
    ) -> Result<Completion, SessionError> {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale exchange result"
            );
            return Ok(Completion::Discarded);
        }
        self.in_flight = false;

        let reply = result.map_err(|err| self.fail(err))?;
        self.history.extend(ticket.pending);
        let steps = self.decode(&reply);
        self.history.push(Message::assistant(reply));
        info!(
            steps = steps.len(),
            history = self.history.len(),
            "exchange completed"
        );
        Ok(Completion::Steps(steps))
    }

    /// Give up on an outstanding ticket without an exchange result.
    ///
    /// The session leaves the in-flight state and history is untouched. A
    /// ticket from an earlier generation has nothing to release.
    pub fn abandon(&mut self, ticket: ExchangeTicket) {
        if ticket.generation != self.generation {
            return;
        }
        self.in_flight = false;
        debug!(generation = self.generation, "exchange abandoned");
    }

    /// Map a backend failure to a session signal, entering `Limited` on throttling.
    pub fn fail(&mut self, err: ExchangeError) -> SessionError {
        match err {
            ExchangeError::Throttled { retry_after_secs } => {
                let secs = self.governor.limit(retry_after_secs, self.clock.now());
                warn!(retry_after_secs = secs, "backend throttled; entering limited state");
                SessionError::Throttled {
                    retry_after_secs: secs,
                }
            }
            ExchangeError::Failed(message) => {
                warn!(%message, "backend exchange failed");
                SessionError::Backend(message)
            }
        }
    }

    /// Run the initial template + chat exchange, emitting each decoded batch.
    ///
    /// The template's own steps are emitted before the chat exchange so they are
    /// materialized even if the exchange fails.
    pub fn start<B: Backend, F: FnMut(Vec<Step>)>(
        &mut self,
        backend: &B,
        prompt: &str,
        mut on_batch: F,
    ) -> Result<(), SessionError> {
        if prompt.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.reset();
        let template = backend.template(prompt).map_err(|err| self.fail(err))?;
        let ticket = self.begin_start(prompt, &template.prompts)?;

        if let Some(ui_prompt) = template.ui_prompts.first() {
            let steps = self.decode(ui_prompt);
            if !steps.is_empty() {
                on_batch(steps);
            }
        }

        let result = backend.exchange(ticket.request());
        if let Completion::Steps(steps) = self.complete(ticket, result)? {
            on_batch(steps);
        }
        Ok(())
    }

    /// Send one follow-up message and emit the decoded batch.
    pub fn send_follow_up<B: Backend, F: FnMut(Vec<Step>)>(
        &mut self,
        backend: &B,
        text: &str,
        mut on_batch: F,
    ) -> Result<(), SessionError> {
        let ticket = self.begin_follow_up(text)?;
        let result = backend.exchange(ticket.request());
        if let Completion::Steps(steps) = self.complete(ticket, result)? {
            on_batch(steps);
        }
        Ok(())
    }
}
