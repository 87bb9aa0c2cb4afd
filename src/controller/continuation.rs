//! Bounded-history continuation
//!
//! When history reaches the compaction threshold, the session's state is
//! replaced in place by a fresh state seeded from a summary. The session id
//! and the shared cell stay the same, so signals arriving during the
//! hand-off land in the queue that gets carried over.

use super::state::{Continuation, ControllerState, SharedState};
use crate::error::ControllerError;
use crate::runtime::{retry, RetryPolicy, Summarizer};
use std::sync::Arc;

/// Default compaction threshold (message count)
pub const DEFAULT_CONTINUATION_THRESHOLD: usize = 250;

pub struct ContinuationManager {
    threshold: usize,
    summarizer: Arc<dyn Summarizer>,
    retry: RetryPolicy,
}

impl ContinuationManager {
    pub fn new(threshold: usize, summarizer: Arc<dyn Summarizer>, retry: RetryPolicy) -> Self {
        Self {
            threshold,
            summarizer,
            retry,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_continue(&self, state: &ControllerState) -> bool {
        state.history.len() >= self.threshold
    }

    /// Run the threshold check and, if it trips, swap in a continued state.
    ///
    /// Returns the continuation payload that seeded the new state. The
    /// summarizer runs without the lock held; the swap itself happens under
    /// one lock acquisition so queue contents cannot be lost or duplicated.
    pub async fn check(
        &self,
        shared: &SharedState,
    ) -> Result<Option<Continuation>, ControllerError> {
        let history = {
            let state = shared.lock();
            if !self.should_continue(&state) {
                return Ok(None);
            }
            state.history.clone()
        };

        tracing::info!(
            session_id = %shared.session_id(),
            messages = history.len(),
            threshold = self.threshold,
            "History reached continuation threshold, summarizing"
        );

        let summarizer = &self.summarizer;
        let summary = retry(&self.retry, "summarizer", || summarizer.summarize(&history))
            .await
            .map_err(|failure| failure.into_controller_error("summarizer"))?;

        let mut state = shared.lock();
        let queue = std::mem::take(&mut state.queue);
        let pending_action = state.pending_action.take();
        let continued = ControllerState::continued(
            state.goal.clone(),
            Some(summary.clone()),
            queue,
            pending_action,
            state.confirmation_granted,
        );
        let chat_ended = state.chat_ended;
        *state = continued;
        state.chat_ended = chat_ended;

        let continuation = state.to_continuation(Some(summary));
        drop(state);

        tracing::info!(
            session_id = %shared.session_id(),
            goal = %continuation.goal_id,
            carried_prompts = continuation.pending_prompts.len(),
            "Continued session with summarized history"
        );
        Ok(Some(continuation))
    }
}
