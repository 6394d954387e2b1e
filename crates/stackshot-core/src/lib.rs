//! Stack reconciliation and progress polling for stackshot.
//!
//! This crate ties the stack configuration and the remote API boundary together
//! into the `Engine`: it loads the live state of one stack, decides between
//! create and update, submits the mutation, then polls until the stack reaches
//! a terminal status, streaming new stack events to an `EventConsumer` in
//! chronological order. Delays between polls go through an injectable `Waiter`.

pub mod engine;
pub mod events;
pub mod lifecycle;
pub mod mutation;
pub mod status;
pub mod wait;

pub use engine::{Engine, Observation, Reconciliation, SyncOutcome};
pub use events::{ConsumerError, EventConsumer, EventTracker, LastSeenMarker};
pub use lifecycle::StackPresence;
pub use mutation::{create_request, update_request};
pub use status::{terminal_outcome, TerminalOutcome};
pub use wait::{NoWait, SleepWaiter, WaitConfig, Waiter};

use stackshot_remote::{RemoteError, StackStatus};
use std::fmt;
use thiserror::Error;

/// Remote call that failed, carried as context in `CoreError::Remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    DescribeStack,
    DescribeEvents,
    CreateStack,
    UpdateStack,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteOperation::DescribeStack => "describe stack",
            RemoteOperation::DescribeEvents => "load stack events",
            RemoteOperation::CreateStack => "create stack",
            RemoteOperation::UpdateStack => "update stack",
        })
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config error: {0}")]
    Config(#[from] stackshot_schema::ConfigError),
    #[error("remote error: failed to {operation}: {source}")]
    Remote {
        operation: RemoteOperation,
        #[source]
        source: RemoteError,
    },
    #[error("stack '{stack}' failed to complete, status: {status}{}", reason_suffix(.reason.as_deref()))]
    StackFailed {
        stack: String,
        status: StackStatus,
        reason: Option<String>,
    },
    #[error(
        "stack '{stack}' did not reach a terminal status after {attempts} attempts; \
         check the stack status in the orchestration service"
    )]
    Timeout { stack: String, attempts: u32 },
    #[error("event consumer failed: {0}")]
    Consumer(#[source] ConsumerError),
}

fn reason_suffix(reason: Option<&str>) -> String {
    reason.map(|r| format!(" ({r})")).unwrap_or_default()
}

impl CoreError {
    pub(crate) fn remote(operation: RemoteOperation) -> impl FnOnce(RemoteError) -> Self {
        move |source| CoreError::Remote { operation, source }
    }
}
