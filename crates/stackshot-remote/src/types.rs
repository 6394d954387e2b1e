//! Wire types exchanged with the orchestration service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stackshot_schema::{EventId, OnFailure, StackId};
use std::collections::BTreeMap;
use std::fmt;

macro_rules! stack_statuses {
    ($($variant:ident => $wire:literal,)+) => {
        /// Lifecycle status of a stack as reported by the service.
        ///
        /// Values outside the known vocabulary are preserved in `Unknown`.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum StackStatus {
            $($variant,)+
            Unknown(String),
        }

        impl StackStatus {
            pub fn as_str(&self) -> &str {
                match self {
                    $(StackStatus::$variant => $wire,)+
                    StackStatus::Unknown(s) => s,
                }
            }
        }

        impl From<String> for StackStatus {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($wire => StackStatus::$variant,)+
                    _ => StackStatus::Unknown(s),
                }
            }
        }
    };
}

stack_statuses! {
    CreateInProgress => "CREATE_IN_PROGRESS",
    CreateFailed => "CREATE_FAILED",
    CreateComplete => "CREATE_COMPLETE",
    RollbackInProgress => "ROLLBACK_IN_PROGRESS",
    RollbackFailed => "ROLLBACK_FAILED",
    RollbackComplete => "ROLLBACK_COMPLETE",
    DeleteInProgress => "DELETE_IN_PROGRESS",
    DeleteFailed => "DELETE_FAILED",
    DeleteComplete => "DELETE_COMPLETE",
    UpdateInProgress => "UPDATE_IN_PROGRESS",
    UpdateCompleteCleanupInProgress => "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
    UpdateComplete => "UPDATE_COMPLETE",
    UpdateFailed => "UPDATE_FAILED",
    UpdateRollbackInProgress => "UPDATE_ROLLBACK_IN_PROGRESS",
    UpdateRollbackFailed => "UPDATE_ROLLBACK_FAILED",
    UpdateRollbackCompleteCleanupInProgress => "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
    UpdateRollbackComplete => "UPDATE_ROLLBACK_COMPLETE",
    ReviewInProgress => "REVIEW_IN_PROGRESS",
    ImportInProgress => "IMPORT_IN_PROGRESS",
    ImportComplete => "IMPORT_COMPLETE",
    ImportRollbackInProgress => "IMPORT_ROLLBACK_IN_PROGRESS",
    ImportRollbackFailed => "IMPORT_ROLLBACK_FAILED",
    ImportRollbackComplete => "IMPORT_ROLLBACK_COMPLETE",
}

impl From<&str> for StackStatus {
    fn from(s: &str) -> Self {
        StackStatus::from(s.to_owned())
    }
}

impl From<StackStatus> for String {
    fn from(status: StackStatus) -> Self {
        match status {
            StackStatus::Unknown(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub output_key: String,
    pub output_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Last-fetched representation of a live stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSnapshot {
    pub stack_id: StackId,
    pub stack_name: String,
    pub stack_status: StackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<StackOutput>,
    /// Any other fields the service returns, kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl StackSnapshot {
    pub fn new(
        stack_id: impl Into<StackId>,
        stack_name: impl Into<String>,
        stack_status: StackStatus,
    ) -> Self {
        Self {
            stack_id: stack_id.into(),
            stack_name: stack_name.into(),
            stack_status,
            stack_status_reason: None,
            description: None,
            creation_time: None,
            last_updated_time: None,
            outputs: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// One entry of a stack's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: EventId,
    pub stack_id: StackId,
    pub stack_name: String,
    pub timestamp: DateTime<Utc>,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    pub resource_type: String,
    pub resource_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_status_reason: Option<String>,
}

/// A page of stack events, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    #[serde(default)]
    pub events: Vec<StackEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Create mutation.
///
/// `None` collections are omitted from the wire; the service treats an
/// omitted collection differently from an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStackRequest {
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    pub enable_termination_protection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<OnFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_rollback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

/// Update mutation. Carries no create-only settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStackRequest {
    pub stack_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

/// Service acknowledgement of an accepted mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAccepted {
    pub stack_id: StackId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_known_and_unknown() {
        let known: StackStatus = serde_json::from_str("\"ROLLBACK_COMPLETE\"").unwrap();
        assert_eq!(known, StackStatus::RollbackComplete);
        assert_eq!(serde_json::to_string(&known).unwrap(), "\"ROLLBACK_COMPLETE\"");

        let unknown: StackStatus = serde_json::from_str("\"HIBERNATING\"").unwrap();
        assert_eq!(unknown, StackStatus::Unknown("HIBERNATING".to_owned()));
        assert_eq!(unknown.to_string(), "HIBERNATING");
    }

    #[test]
    fn snapshot_keeps_unmodelled_fields() {
        let json = r#"{
            "stack_id": "arn:stack/web/1",
            "stack_name": "web",
            "stack_status": "CREATE_COMPLETE",
            "drift_status": "IN_SYNC",
            "role_arn": "arn:role/deployer"
        }"#;
        let snapshot: StackSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.stack_status, StackStatus::CreateComplete);
        assert_eq!(snapshot.extra["drift_status"], "IN_SYNC");
        assert_eq!(snapshot.extra.len(), 2);
    }

    #[test]
    fn create_request_omits_unset_fields() {
        let request = CreateStackRequest {
            stack_name: "web".to_owned(),
            template_body: None,
            template_url: Some("https://t.example/web.yaml".to_owned()),
            enable_termination_protection: false,
            on_failure: Some(OnFailure::Delete),
            disable_rollback: None,
            parameters: None,
            tags: Some(Vec::new()),
            capabilities: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["on_failure"], "DELETE");
        assert!(!obj.contains_key("disable_rollback"));
        assert!(!obj.contains_key("parameters"));
        assert!(!obj.contains_key("template_body"));
        assert_eq!(obj["tags"], serde_json::json!([]));
    }

    #[test]
    fn event_page_defaults_to_empty() {
        let page: EventPage = serde_json::from_str("{}").unwrap();
        assert!(page.events.is_empty());
        assert!(page.next_token.is_none());
    }
}
