use serde::Serialize;
use stackshot_remote::StackStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalOutcome {
    Success,
    Failure,
}

/// Classify a status as terminal, or `None` while the stack is still changing.
///
/// The table is closed: anything not listed, including statuses the service
/// adds later, keeps the poll loop running.
pub fn terminal_outcome(status: &StackStatus) -> Option<TerminalOutcome> {
    match status {
        StackStatus::CreateComplete | StackStatus::UpdateComplete => {
            Some(TerminalOutcome::Success)
        }
        StackStatus::CreateFailed
        | StackStatus::UpdateFailed
        | StackStatus::UpdateRollbackComplete
        | StackStatus::UpdateRollbackFailed
        | StackStatus::DeleteComplete
        | StackStatus::DeleteFailed
        | StackStatus::RollbackFailed
        | StackStatus::RollbackComplete => Some(TerminalOutcome::Failure),
        _ => None,
    }
}
