//! Model load state machine.
//!
//! The loader never performs I/O. It hands out [`FetchRequest`]s, one at a
//! time, and is told how each attempt ended. Every request carries an
//! [`AttemptTicket`]; results whose ticket is no longer current (source
//! switched, retried, or timed out) are ignored.

use foundation::bounds::Aabb3;
use foundation::time::{Deadline, Time};
use serde::{Deserialize, Serialize};

use crate::load_state::{LoadState, progress_percent};
use crate::sources::{cache_bust, resolve_candidates};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// User-triggered retries allowed after a terminal failure.
    pub max_retries: u32,
    pub attempt_timeout_ms: u64,
    pub public_prefix: String,
    pub cache_busting: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout_ms: 30_000,
            public_prefix: "/public".to_string(),
            cache_busting: true,
        }
    }
}

/// Identifies one fetch attempt: load generation plus candidate index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttemptTicket {
    pub generation: u64,
    pub candidate: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: AttemptTicket,
    /// Candidate as resolved; this is what failure reports list.
    pub url: String,
    /// What to actually request (may carry a cache-busting query).
    pub fetch_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStep {
    Fetch(FetchRequest),
    Failed { reason: String, attempted: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    NotFailed,
    CapExceeded { max: u32 },
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::NotFailed => write!(f, "retry is only possible after a failed load"),
            RetryError::CapExceeded { max } => write!(f, "retry limit reached ({max})"),
        }
    }
}

impl std::error::Error for RetryError {}

#[derive(Debug, Clone)]
struct InFlight {
    request: FetchRequest,
    deadline: Deadline,
}

#[derive(Debug)]
pub struct ModelLoader {
    config: LoaderConfig,
    state: LoadState,
    generation: u64,
    source: String,
    fallbacks: Vec<String>,
    candidates: Vec<String>,
    attempted: Vec<String>,
    in_flight: Option<InFlight>,
    retries_used: u32,
}

impl ModelLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            state: LoadState::NotStarted,
            generation: 0,
            source: String::new(),
            fallbacks: Vec::new(),
            candidates: Vec::new(),
            attempted: Vec::new(),
            in_flight: None,
            retries_used: 0,
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Candidates that have failed in the current run, in order.
    pub fn attempted(&self) -> &[String] {
        &self.attempted
    }

    pub fn in_flight(&self) -> Option<&FetchRequest> {
        self.in_flight.as_ref().map(|f| &f.request)
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    pub fn retries_remaining(&self) -> u32 {
        self.config.max_retries.saturating_sub(self.retries_used)
    }

    pub fn is_current(&self, ticket: AttemptTicket) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| f.request.ticket == ticket)
    }

    /// Start loading a new source. Resets the retry budget.
    pub fn begin(&mut self, source: &str, fallbacks: &[String], now: Time) -> LoadStep {
        self.source = source.to_string();
        self.fallbacks = fallbacks.to_vec();
        self.retries_used = 0;
        tracing::info!(source, "model load started");
        self.restart(now)
    }

    /// Re-run the candidate list after a terminal failure.
    pub fn retry(&mut self, now: Time) -> Result<LoadStep, RetryError> {
        if !self.state.is_failed() {
            return Err(RetryError::NotFailed);
        }
        if self.retries_used >= self.config.max_retries {
            tracing::warn!(max = self.config.max_retries, "retry rejected: limit reached");
            return Err(RetryError::CapExceeded {
                max: self.config.max_retries,
            });
        }
        self.retries_used += 1;
        tracing::info!(
            source = %self.source,
            retry = self.retries_used,
            "retrying model load"
        );
        Ok(self.restart(now))
    }

    /// Forget the current load; any outstanding result becomes stale.
    pub fn abandon(&mut self) {
        self.generation += 1;
        self.in_flight = None;
        self.state = LoadState::NotStarted;
    }

    /// Record transfer progress. Returns the new percentage when it changed.
    pub fn on_progress(&mut self, ticket: AttemptTicket, loaded: u64, total: Option<u64>) -> Option<u8> {
        if !self.is_current(ticket) {
            return None;
        }
        let pct = progress_percent(loaded, total)?;
        match &mut self.state {
            LoadState::Loading { progress } if *progress != Some(pct) => {
                *progress = Some(pct);
                Some(pct)
            }
            _ => None,
        }
    }

    /// An attempt failed. Returns the next step, or `None` for a stale ticket.
    pub fn on_attempt_failed(&mut self, ticket: AttemptTicket, reason: &str, now: Time) -> Option<LoadStep> {
        if !self.is_current(ticket) {
            tracing::debug!(?ticket, "ignoring stale attempt failure");
            return None;
        }
        Some(self.fail_current(reason, now))
    }

    /// An attempt produced a model. Returns `false` (and changes nothing) for a
    /// stale ticket.
    pub fn on_attempt_succeeded(&mut self, ticket: AttemptTicket, bounds: Aabb3) -> bool {
        if !self.is_current(ticket) {
            tracing::warn!(?ticket, "discarding late model result");
            return false;
        }
        let url = self
            .in_flight
            .take()
            .map(|f| f.request.url)
            .unwrap_or_default();
        tracing::info!(url = %url, failed_before = self.attempted.len(), "model loaded");
        self.state = LoadState::Loaded { bounds };
        true
    }

    /// Fail the in-flight attempt if its deadline passed.
    pub fn check_timeout(&mut self, now: Time) -> Option<LoadStep> {
        let inflight = self.in_flight.as_ref()?;
        if !inflight.deadline.has_passed(now) {
            return None;
        }
        let reason = format!(
            "timed out after {} ms",
            self.config.attempt_timeout_ms
        );
        Some(self.fail_current(&reason, now))
    }

    fn restart(&mut self, now: Time) -> LoadStep {
        self.generation += 1;
        self.in_flight = None;
        self.attempted.clear();
        self.candidates =
            resolve_candidates(&self.source, &self.config.public_prefix, &self.fallbacks);

        if self.candidates.is_empty() {
            let reason = "no model source".to_string();
            self.state = LoadState::Failed {
                reason: reason.clone(),
                attempted: Vec::new(),
            };
            return LoadStep::Failed {
                reason,
                attempted: Vec::new(),
            };
        }

        self.state = LoadState::Loading { progress: None };
        self.start_candidate(0, now)
    }

    fn start_candidate(&mut self, candidate: usize, now: Time) -> LoadStep {
        let url = self.candidates[candidate].clone();
        let fetch_url = if self.config.cache_busting {
            cache_bust(&url, now.as_millis().max(0.0) as u64)
        } else {
            url.clone()
        };
        let request = FetchRequest {
            ticket: AttemptTicket {
                generation: self.generation,
                candidate,
            },
            url,
            fetch_url,
        };
        tracing::debug!(url = %request.url, candidate, "fetching model candidate");
        self.in_flight = Some(InFlight {
            request: request.clone(),
            deadline: Deadline::in_millis(now, self.config.attempt_timeout_ms as f64),
        });
        if let LoadState::Loading { progress } = &mut self.state {
            *progress = None;
        }
        LoadStep::Fetch(request)
    }

    fn fail_current(&mut self, reason: &str, now: Time) -> LoadStep {
        let Some(inflight) = self.in_flight.take() else {
            return LoadStep::Failed {
                reason: reason.to_string(),
                attempted: self.attempted.clone(),
            };
        };
        let FetchRequest { ticket, url, .. } = inflight.request;
        tracing::warn!(url = %url, reason, "model candidate failed");
        self.attempted.push(url);

        let next = ticket.candidate + 1;
        if next < self.candidates.len() {
            return self.start_candidate(next, now);
        }

        let reason = format!(
            "could not load model from any of {} location(s): {reason}",
            self.attempted.len()
        );
        tracing::warn!(
            source = %self.source,
            attempted = ?self.attempted,
            retries_remaining = self.retries_remaining(),
            "model load failed"
        );
        self.state = LoadState::Failed {
            reason: reason.clone(),
            attempted: self.attempted.clone(),
        };
        LoadStep::Failed {
            reason,
            attempted: self.attempted.clone(),
        }
    }
}
