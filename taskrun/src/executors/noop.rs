use anyhow::Result;
use tracing::info;

use super::{Executor, ExecutorContext};
use crate::core::outcome::ExecutionOutcome;
use crate::core::schema::ExecutorSchema;
use crate::core::types::{Options, Outcome};

const SCHEMA: &str = include_str!("../../schemas/noop.schema.json");

/// Succeeds immediately. Useful as a grouping target.
pub struct NoopExecutor;

impl NoopExecutor {
    pub fn schema() -> Result<ExecutorSchema> {
        ExecutorSchema::from_json_str(SCHEMA)
    }
}

impl Executor for NoopExecutor {
    fn run(&self, _options: Options, context: ExecutorContext) -> Result<ExecutionOutcome> {
        info!(
            project = %context.project_name,
            target = %context.target_name,
            "noop target"
        );
        Ok(ExecutionOutcome::ready(Outcome::SUCCESS))
    }
}
