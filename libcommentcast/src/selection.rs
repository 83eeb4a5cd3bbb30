//! Retry-until-accepted comment selection
//!
//! The loop is the only place that decides between retrying and aborting.
//! Lower layers report typed failures; everything except a terminal token
//! rejection is treated as "try another resource".

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::error::{Result, SelectionError, SourceError};
use crate::filter::CommentFilter;
use crate::source::CandidateSource;
use crate::types::SelectedComment;

/// Upper bounds for one selection; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionLimits {
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl SelectionLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SelectionConfig) -> Result<Self> {
        Ok(Self {
            max_attempts: config.max_attempts,
            deadline: config.deadline_duration()?,
        })
    }
}

/// Mutable state of one selection run
#[derive(Debug, Clone)]
pub struct SelectionContext {
    limits: SelectionLimits,
    attempts: u32,
    started: Instant,
    last_source_url: Option<String>,
}

impl SelectionContext {
    pub fn new(limits: SelectionLimits) -> Self {
        Self {
            limits,
            attempts: 0,
            started: Instant::now(),
            last_source_url: None,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Permalink of the last resource that returned comments
    pub fn last_source_url(&self) -> Option<&str> {
        self.last_source_url.as_deref()
    }

    fn remaining(&self) -> Option<Duration> {
        self.limits
            .deadline
            .map(|deadline| deadline.saturating_sub(self.elapsed()))
    }

    fn check_limits(&self) -> std::result::Result<(), SelectionError> {
        if let Some(max) = self.limits.max_attempts {
            if self.attempts >= max {
                return Err(SelectionError::Exhausted {
                    attempts: self.attempts,
                });
            }
        }
        if self.remaining() == Some(Duration::ZERO) {
            return Err(self.deadline_exceeded());
        }
        Ok(())
    }

    fn deadline_exceeded(&self) -> SelectionError {
        SelectionError::DeadlineExceeded {
            attempts: self.attempts,
            elapsed: self.elapsed(),
        }
    }
}

enum Attempt {
    Selected(String),
    Retry,
}

pub struct Selector {
    source: Arc<dyn CandidateSource>,
    filter: CommentFilter,
}

impl Selector {
    pub fn new(source: Arc<dyn CandidateSource>, filter: CommentFilter) -> Self {
        Self { source, filter }
    }

    pub fn filter(&self) -> &CommentFilter {
        &self.filter
    }

    /// Fetch and filter until one comment is accepted or a limit is hit
    ///
    /// A pending attempt is cancelled when the deadline passes.
    pub async fn get_comment(
        &self,
        ctx: &mut SelectionContext,
    ) -> std::result::Result<SelectedComment, SelectionError> {
        loop {
            ctx.check_limits()?;
            ctx.attempts += 1;

            let outcome = match ctx.remaining() {
                Some(remaining) => {
                    let result = tokio::time::timeout(remaining, self.attempt(ctx)).await;
                    match result {
                        Ok(outcome) => outcome?,
                        Err(_) => {
                            warn!(attempt = ctx.attempts, "Selection deadline reached mid-attempt");
                            return Err(ctx.deadline_exceeded());
                        }
                    }
                }
                None => self.attempt(ctx).await?,
            };

            if let Attempt::Selected(text) = outcome {
                let source_url = ctx.last_source_url.clone().unwrap_or_default();
                info!(
                    attempts = ctx.attempts,
                    source = %source_url,
                    "Selected comment"
                );
                return Ok(SelectedComment {
                    text,
                    source_url,
                    attempts: ctx.attempts,
                });
            }
        }
    }

    async fn attempt(
        &self,
        ctx: &mut SelectionContext,
    ) -> std::result::Result<Attempt, SelectionError> {
        let batch = match self.source.fetch_candidates().await {
            Ok(batch) => batch,
            Err(SourceError::Token(e)) if e.is_terminal() => {
                warn!(attempt = ctx.attempts, "Aborting selection: {}", e);
                return Err(SelectionError::AuthFailed(e.to_string()));
            }
            Err(e) => {
                debug!(attempt = ctx.attempts, "No candidates: {}", e);
                return Ok(Attempt::Retry);
            }
        };

        ctx.last_source_url = Some(batch.permalink_url.clone());

        let mut accepted = self.filter.accepted(&batch.candidates).await;
        info!(
            attempt = ctx.attempts,
            track_id = batch.resource_id,
            candidates = batch.candidates.len(),
            accepted = accepted.len(),
            "Filtered track comments"
        );

        if accepted.is_empty() {
            return Ok(Attempt::Retry);
        }

        let index = rand::thread_rng().gen_range(0..accepted.len());
        Ok(Attempt::Selected(accepted.swap_remove(index)))
    }
}
