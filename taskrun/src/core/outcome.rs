//! The two result shapes an executor can produce, and the single routine
//! that reduces either one to a final [`Outcome`].

use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use tracing::trace;

use crate::core::error::RunError;
use crate::core::types::{ExecutorRef, Outcome};
use crate::exit_codes;

/// Lazy, finite, non-restartable sequence of outcomes.
pub type OutcomeStream = BoxStream<'static, Result<Outcome>>;

/// What an executor hands back when invoked.
pub enum ExecutionOutcome {
    /// One deferred result.
    Single(BoxFuture<'static, Result<Outcome>>),
    /// Results produced one at a time, e.g. per phase or per rebuild.
    Stream(OutcomeStream),
}

impl ExecutionOutcome {
    pub fn ready(outcome: Outcome) -> Self {
        ExecutionOutcome::Single(Box::pin(futures::future::ready(Ok(outcome))))
    }

    pub fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        ExecutionOutcome::Stream(Box::pin(futures::stream::iter(
            outcomes.into_iter().map(Ok),
        )))
    }
}

impl std::fmt::Debug for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionOutcome::Single(_) => f.write_str("ExecutionOutcome::Single(..)"),
            ExecutionOutcome::Stream(_) => f.write_str("ExecutionOutcome::Stream(..)"),
        }
    }
}

/// Await or drain `outcome`, returning the only or last result.
///
/// Stream elements are consumed strictly in arrival order and all but the
/// last are dropped. The first error ends the drain. An empty stream is an
/// internal error rather than an implicit failure code.
pub async fn final_outcome(outcome: ExecutionOutcome, executor: &ExecutorRef) -> Result<Outcome> {
    match outcome {
        ExecutionOutcome::Single(deferred) => deferred.await,
        ExecutionOutcome::Stream(mut stream) => {
            let mut last = None;
            let mut seen = 0usize;
            while let Some(next) = stream.next().await {
                let outcome = next?;
                seen += 1;
                trace!(seen, success = outcome.success, "outcome received");
                last = Some(outcome);
            }
            last.ok_or_else(|| {
                RunError::EmptyOutcomeStream {
                    executor: executor.to_string(),
                }
                .into()
            })
        }
    }
}

pub fn exit_code(outcome: Outcome) -> i32 {
    if outcome.success {
        exit_codes::OK
    } else {
        exit_codes::FAILURE
    }
}
