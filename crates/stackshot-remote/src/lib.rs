//! Remote orchestration API boundary for stackshot.
//!
//! This crate defines the `StackApi` capability the reconciliation engine drives
//! (describe stack, page through stack events, create, update), the wire types
//! exchanged with the service, the classification of service errors into the
//! conditions the engine branches on, a blocking HTTP backend for a JSON gateway,
//! and `MockStackApi`, a scripted in-memory double.

pub mod config;
pub mod http;
pub mod mock;
pub mod types;

pub use config::RemoteConfig;
pub use http::HttpBackend;
pub use mock::MockStackApi;
pub use types::{
    CreateStackRequest, EventPage, MutationAccepted, Parameter, StackEvent, StackOutput,
    StackSnapshot, StackStatus, Tag, UpdateStackRequest,
};

/// Protocol version sent as `X-Stackshot-Protocol` header on all HTTP requests.
pub const PROTOCOL_VERSION: u32 = 1;

/// Service error code for request validation failures.
pub const VALIDATION_ERROR: &str = "ValidationError";

/// Gateway error code for a stack that does not exist.
pub const STACK_NOT_FOUND: &str = "StackNotFound";

const NO_UPDATES_MESSAGE: &str = "No updates are to be performed.";

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("stack not found: {0}")]
    StackNotFound(String),
    #[error("no updates are to be performed")]
    NoUpdates,
    #[error("{code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::StackNotFound(_))
    }

    pub fn is_no_updates(&self) -> bool {
        matches!(self, RemoteError::NoUpdates)
    }
}

/// Map a service error payload to a typed `RemoteError`.
///
/// `subject` is the stack name or id the request was about. A missing stack
/// is recognized only by the gateway's `StackNotFound` code or by a
/// `ValidationError` reading "<subject> does not exist"; an unrelated 404 or
/// validation message stays an `Api` error.
pub fn classify_api_error(subject: &str, status: u16, code: &str, message: &str) -> RemoteError {
    if code == STACK_NOT_FOUND
        || (code == VALIDATION_ERROR
            && !subject.is_empty()
            && message.contains(&format!("{subject} does not exist")))
    {
        return RemoteError::StackNotFound(message.to_owned());
    }
    if code == VALIDATION_ERROR && message.contains(NO_UPDATES_MESSAGE) {
        return RemoteError::NoUpdates;
    }
    RemoteError::Api {
        status,
        code: code.to_owned(),
        message: message.to_owned(),
    }
}

/// Capability surface of the remote orchestration service.
pub trait StackApi: Send + Sync {
    /// Describe a stack by name or remote-assigned identifier.
    ///
    /// A missing stack is reported as `RemoteError::StackNotFound`.
    fn describe_stack(&self, name_or_id: &str) -> Result<StackSnapshot, RemoteError>;

    /// Fetch one page of stack events, most recent first.
    fn describe_events_page(
        &self,
        name_or_id: &str,
        next_token: Option<&str>,
    ) -> Result<EventPage, RemoteError>;

    fn create_stack(&self, request: &CreateStackRequest) -> Result<MutationAccepted, RemoteError>;

    /// Submit an update. An update with nothing to change is reported as
    /// `RemoteError::NoUpdates`.
    fn update_stack(&self, request: &UpdateStackRequest) -> Result<MutationAccepted, RemoteError>;
}

impl<T: StackApi + ?Sized> StackApi for &T {
    fn describe_stack(&self, name_or_id: &str) -> Result<StackSnapshot, RemoteError> {
        (**self).describe_stack(name_or_id)
    }

    fn describe_events_page(
        &self,
        name_or_id: &str,
        next_token: Option<&str>,
    ) -> Result<EventPage, RemoteError> {
        (**self).describe_events_page(name_or_id, next_token)
    }

    fn create_stack(&self, request: &CreateStackRequest) -> Result<MutationAccepted, RemoteError> {
        (**self).create_stack(request)
    }

    fn update_stack(&self, request: &UpdateStackRequest) -> Result<MutationAccepted, RemoteError> {
        (**self).update_stack(request)
    }
}
