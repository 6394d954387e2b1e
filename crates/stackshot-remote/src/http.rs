use crate::{
    classify_api_error, CreateStackRequest, EventPage, MutationAccepted, RemoteConfig,
    RemoteError, StackApi, StackSnapshot, UpdateStackRequest,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// HTTP backend for a JSON gateway in front of the orchestration service.
///
/// Expects a small REST API:
/// - `GET  /stacks/describe?stack_name=<name-or-id>`
/// - `GET  /stacks/events?stack_name=<name-or-id>&next_token=<token>`
/// - `POST /stacks/create`   (JSON `CreateStackRequest`)
/// - `POST /stacks/update`   (JSON `UpdateStackRequest`)
///
/// Non-2xx responses carry `{"code": ..., "message": ...}`. A missing stack
/// is reported with code `StackNotFound`, or as a `ValidationError` naming it.
pub struct HttpBackend {
    config: RemoteConfig,
    agent: ureq::Agent,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl HttpBackend {
    pub fn new(config: RemoteConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(agent_config);
        Self { config, agent }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/stacks/{path}", self.config.url)
    }

    fn do_get<T: DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let mut req = self
            .agent
            .get(url)
            .header("X-Stackshot-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        for (key, value) in query {
            req = req.query(*key, *value);
        }
        let resp = req.call().map_err(|e| RemoteError::Http(e.to_string()))?;
        Self::decode(url, subject, resp)
    }

    fn do_post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let payload =
            serde_json::to_vec(body).map_err(|e| RemoteError::Serialization(e.to_string()))?;
        let mut req = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Stackshot-Protocol", &crate::PROTOCOL_VERSION.to_string());
        if let Some(ref token) = self.config.auth_token {
            req = req.header("Authorization", &format!("Bearer {token}"));
        }
        let resp = req
            .send(&payload[..])
            .map_err(|e| RemoteError::Http(e.to_string()))?;
        Self::decode(url, subject, resp)
    }

    /// `subject` is the stack name or id the request concerns, used to
    /// recognize a missing-stack error.
    fn decode<T: DeserializeOwned>(
        url: &str,
        subject: &str,
        resp: ureq::http::Response<ureq::Body>,
    ) -> Result<T, RemoteError> {
        let code = resp.status().as_u16();
        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(e.to_string()))?;

        if code >= 400 {
            let parsed: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            if parsed.code.is_empty() && parsed.message.is_empty() {
                let text = String::from_utf8_lossy(&body).trim().to_owned();
                let message = if text.is_empty() {
                    format!("HTTP {code} for {url}")
                } else {
                    text
                };
                return Err(classify_api_error(subject, code, "HttpError", &message));
            }
            return Err(classify_api_error(subject, code, &parsed.code, &parsed.message));
        }

        serde_json::from_slice(&body).map_err(|e| RemoteError::Serialization(e.to_string()))
    }
}

impl StackApi for HttpBackend {
    fn describe_stack(&self, name_or_id: &str) -> Result<StackSnapshot, RemoteError> {
        let url = self.url("describe");
        tracing::debug!("GET {url} stack_name={name_or_id}");
        self.do_get(&url, name_or_id, &[("stack_name", name_or_id)])
    }

    fn describe_events_page(
        &self,
        name_or_id: &str,
        next_token: Option<&str>,
    ) -> Result<EventPage, RemoteError> {
        let url = self.url("events");
        tracing::debug!("GET {url} stack_name={name_or_id} next_token={next_token:?}");
        match next_token {
            Some(token) => self.do_get(
                &url,
                name_or_id,
                &[("stack_name", name_or_id), ("next_token", token)],
            ),
            None => self.do_get(&url, name_or_id, &[("stack_name", name_or_id)]),
        }
    }

    fn create_stack(&self, request: &CreateStackRequest) -> Result<MutationAccepted, RemoteError> {
        let url = self.url("create");
        tracing::debug!("POST {url} stack_name={}", request.stack_name);
        self.do_post(&url, &request.stack_name, request)
    }

    fn update_stack(&self, request: &UpdateStackRequest) -> Result<MutationAccepted, RemoteError> {
        let url = self.url("update");
        tracing::debug!("POST {url} stack_name={}", request.stack_name);
        self.do_post(&url, &request.stack_name, request)
    }
}
