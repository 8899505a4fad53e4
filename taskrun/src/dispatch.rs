//! Invokes a resolved executor and turns what it produces into an exit code.
//!
//! `Parsed → Validated → HelpRendered | Dispatching → Completed`. Help is
//! decided before anything is invoked; the two protocols only differ in how
//! the [`ExecutionOutcome`] is obtained.

use std::io::Write;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::core::outcome::{ExecutionOutcome, exit_code, final_outcome};
use crate::core::types::{ExecutorRef, Options, RunRequest};
use crate::exit_codes;
use crate::executors::{ExecutorContext, ExecutorDescriptor, ExecutorImplementation};
use crate::io::bridge::{LegacyBridge, LegacyRequest};
use crate::io::help::print_help;

/// Everything needed to dispatch one validated request.
pub struct Dispatch<'a> {
    pub request: &'a RunRequest,
    pub executor: &'a ExecutorRef,
    pub descriptor: &'a ExecutorDescriptor,
    /// Combined options; ignored when help was requested.
    pub options: Options,
    pub context: ExecutorContext,
}

/// Dispatch and return the process exit code.
///
/// Executor errors, whether raised on invocation or yielded by the outcome,
/// propagate unmodified.
#[instrument(skip_all, fields(target = %job.request.label(), executor = %job.executor))]
pub async fn dispatch<W: Write>(
    job: Dispatch<'_>,
    bridge: &dyn LegacyBridge,
    out: &mut W,
) -> Result<i32> {
    if job.request.help {
        print_help(out, &job.request.label(), &job.descriptor.schema)?;
        return Ok(exit_codes::OK);
    }

    let outcome = match &job.descriptor.implementation {
        ExecutorImplementation::Native(native) => {
            debug!("invoking native executor");
            native.run(job.options, job.context)?
        }
        ExecutorImplementation::Legacy => {
            debug!("forwarding to legacy bridge");
            let request = LegacyRequest {
                project: job.context.project_name.clone(),
                target: job.context.target_name.clone(),
                configuration: job.context.configuration_name.clone(),
                executor: job.executor.to_string(),
                options: job.options,
            };
            let stream = bridge.schedule_target(&job.context.root, request, job.context.verbose)?;
            ExecutionOutcome::Stream(stream)
        }
    };

    let last = final_outcome(outcome, job.executor).await?;
    let code = exit_code(last);
    info!(success = last.success, exit_code = code, "target finished");
    Ok(code)
}
