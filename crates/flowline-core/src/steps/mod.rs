//! Workflow step model and handlers.
//!
//! A workflow is an ordered list of [`Step`]s. Each variant carries its own
//! configuration; templated fields are resolved against the execution
//! context right before the step runs, so a step sees every output written
//! by the steps before it.
//!
//! Step kinds:
//! - `apiCall` - one HTTP request, JSON response stored under `outputKey`
//! - `notification` - hand a message to the notifier
//! - `createRecord` / `updateRecord` / `findRecord` / `deleteRecord` - CRUD
//! - `condition` - one-way gate that can stop the execution
//! - `delay` - suspend the current execution
//! - `transform` - `map` a template into the context

mod api_call;
mod condition;
mod delay;
mod notification;
mod record;
mod transform;

pub use self::api_call::{ApiCallStep, Header};
pub use self::condition::{ConditionStep, FalseAction, Operator};
pub use self::delay::{DelayStep, DelayUnit};
pub use self::notification::NotificationStep;
pub use self::record::{
    unwrap_template, CreateRecordStep, DeleteRecordStep, FindRecordStep, UpdateRecordStep,
    TEMPLATE_WRAPPER_KEY,
};
pub use self::transform::{TransformOperation, TransformStep};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::services::Services;

/// One typed unit of work, discriminated by `blockType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "blockType", rename_all = "camelCase")]
pub enum Step {
    ApiCall(ApiCallStep),
    Notification(NotificationStep),
    CreateRecord(CreateRecordStep),
    UpdateRecord(UpdateRecordStep),
    FindRecord(FindRecordStep),
    DeleteRecord(DeleteRecordStep),
    Condition(ConditionStep),
    Delay(DelayStep),
    Transform(TransformStep),
}

/// What the executor does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Run the next step.
    Continue,
    /// Halt the execution; remaining steps are skipped.
    Stop,
}

impl Step {
    /// Step kind as written in workflow definitions.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::ApiCall(_) => "apiCall",
            Step::Notification(_) => "notification",
            Step::CreateRecord(_) => "createRecord",
            Step::UpdateRecord(_) => "updateRecord",
            Step::FindRecord(_) => "findRecord",
            Step::DeleteRecord(_) => "deleteRecord",
            Step::Condition(_) => "condition",
            Step::Delay(_) => "delay",
            Step::Transform(_) => "transform",
        }
    }

    /// Context key this step writes to, if any.
    pub fn output_key(&self) -> Option<&str> {
        let key = match self {
            Step::ApiCall(step) => step.output_key.as_deref(),
            Step::CreateRecord(step) => step.output_key.as_deref(),
            Step::FindRecord(step) => step.output_key.as_deref(),
            Step::Transform(step) => step.output_key.as_deref(),
            _ => None,
        };
        key.filter(|k| !k.is_empty())
    }

    /// Run the step against the context.
    ///
    /// Handlers only read the context; outputs are written here, under the
    /// step's `outputKey`.
    pub async fn run(
        &self,
        ctx: &mut ExecutionContext,
        services: &Services,
    ) -> Result<StepOutcome, StepError> {
        let output = match self {
            Step::ApiCall(step) => Some(step.run(ctx, services.http.as_ref()).await?),
            Step::Notification(step) => {
                step.run(ctx, services.notifier.as_ref()).await?;
                None
            }
            Step::CreateRecord(step) => Some(step.run(ctx, services.store.as_ref()).await?),
            Step::UpdateRecord(step) => {
                step.run(ctx, services.store.as_ref()).await?;
                None
            }
            Step::FindRecord(step) => Some(step.run(ctx, services.store.as_ref()).await?),
            Step::DeleteRecord(step) => {
                step.run(ctx, services.store.as_ref()).await?;
                None
            }
            Step::Condition(step) => return Ok(step.outcome(ctx)),
            Step::Delay(step) => {
                step.run().await;
                None
            }
            Step::Transform(step) => step.apply(ctx),
        };

        if let (Some(key), Some(value)) = (self.output_key(), output) {
            store_output(ctx, key, value);
        }

        Ok(StepOutcome::Continue)
    }
}

fn store_output(ctx: &mut ExecutionContext, key: &str, value: Value) {
    tracing::trace!(key = %key, "Storing step output");
    ctx.set_variable(key, value);
}
