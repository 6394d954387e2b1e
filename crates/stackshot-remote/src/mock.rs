use crate::{
    CreateStackRequest, EventPage, MutationAccepted, RemoteError, StackApi, StackEvent,
    StackSnapshot, UpdateStackRequest,
};
use stackshot_schema::StackId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_PAGE_SIZE: usize = 100;

struct ScriptedDescribe {
    result: Result<StackSnapshot, RemoteError>,
    /// Appended to the event history when this response is served.
    events: Vec<StackEvent>,
}

#[derive(Default)]
struct MockState {
    describes: VecDeque<ScriptedDescribe>,
    /// Oldest first.
    history: Vec<StackEvent>,
    events_failure: Option<RemoteError>,
    create_response: Option<Result<MutationAccepted, RemoteError>>,
    update_response: Option<Result<MutationAccepted, RemoteError>>,
    describe_calls: Vec<String>,
    events_calls: Vec<(String, Option<String>)>,
    creates: Vec<CreateStackRequest>,
    updates: Vec<UpdateStackRequest>,
}

/// Scripted in-memory `StackApi`.
///
/// Describe responses are served from a queue; each may bring new events into
/// the stack's history, so a sequence of polls sees the history grow the way a
/// live stack's would. Event pages are served most recent first.
pub struct MockStackApi {
    page_size: usize,
    state: Mutex<MockState>,
}

impl Default for MockStackApi {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            state: Mutex::new(MockState::default()),
        }
    }
}

impl MockStackApi {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a describe response.
    pub fn push_stack(&self, snapshot: StackSnapshot) {
        self.push_stack_with_events(snapshot, Vec::new());
    }

    /// Queue a describe response that also appends `events` (oldest first) to
    /// the history once served.
    pub fn push_stack_with_events(&self, snapshot: StackSnapshot, events: Vec<StackEvent>) {
        self.state().describes.push_back(ScriptedDescribe {
            result: Ok(snapshot),
            events,
        });
    }

    pub fn push_not_found(&self) {
        self.push_describe_error(RemoteError::StackNotFound(
            "Stack does not exist".to_owned(),
        ));
    }

    pub fn push_describe_error(&self, error: RemoteError) {
        self.state().describes.push_back(ScriptedDescribe {
            result: Err(error),
            events: Vec::new(),
        });
    }

    /// Append events (oldest first) to the history immediately.
    pub fn record_events(&self, events: impl IntoIterator<Item = StackEvent>) {
        self.state().history.extend(events);
    }

    /// Fail the next `describe_events_page` call.
    pub fn fail_next_events(&self, error: RemoteError) {
        self.state().events_failure = Some(error);
    }

    pub fn set_create_response(&self, response: Result<MutationAccepted, RemoteError>) {
        self.state().create_response = Some(response);
    }

    pub fn set_update_response(&self, response: Result<MutationAccepted, RemoteError>) {
        self.state().update_response = Some(response);
    }

    /// Names or ids passed to `describe_stack`, in call order.
    pub fn describe_calls(&self) -> Vec<String> {
        self.state().describe_calls.clone()
    }

    /// `(name_or_id, next_token)` of every `describe_events_page` call.
    pub fn events_calls(&self) -> Vec<(String, Option<String>)> {
        self.state().events_calls.clone()
    }

    pub fn creates(&self) -> Vec<CreateStackRequest> {
        self.state().creates.clone()
    }

    pub fn updates(&self) -> Vec<UpdateStackRequest> {
        self.state().updates.clone()
    }

    pub fn remaining_describes(&self) -> usize {
        self.state().describes.len()
    }
}

fn default_id(name: &str) -> StackId {
    StackId::new(format!("arn:mock:stack/{name}"))
}

impl StackApi for MockStackApi {
    fn describe_stack(&self, name_or_id: &str) -> Result<StackSnapshot, RemoteError> {
        let mut state = self.state();
        state.describe_calls.push(name_or_id.to_owned());
        let Some(scripted) = state.describes.pop_front() else {
            return Err(RemoteError::Http(format!(
                "mock: no scripted describe response for '{name_or_id}'"
            )));
        };
        state.history.extend(scripted.events);
        scripted.result
    }

    fn describe_events_page(
        &self,
        name_or_id: &str,
        next_token: Option<&str>,
    ) -> Result<EventPage, RemoteError> {
        let mut state = self.state();
        state
            .events_calls
            .push((name_or_id.to_owned(), next_token.map(str::to_owned)));
        if let Some(error) = state.events_failure.take() {
            return Err(error);
        }

        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| RemoteError::Http(format!("mock: bad next_token '{token}'")))?,
            None => 0,
        };
        let events: Vec<StackEvent> = state
            .history
            .iter()
            .rev()
            .skip(offset)
            .take(self.page_size)
            .cloned()
            .collect();
        let consumed = offset + events.len();
        let next_token = (consumed < state.history.len()).then(|| consumed.to_string());
        Ok(EventPage { events, next_token })
    }

    fn create_stack(&self, request: &CreateStackRequest) -> Result<MutationAccepted, RemoteError> {
        let mut state = self.state();
        state.creates.push(request.clone());
        state.create_response.take().unwrap_or_else(|| {
            Ok(MutationAccepted {
                stack_id: default_id(&request.stack_name),
            })
        })
    }

    fn update_stack(&self, request: &UpdateStackRequest) -> Result<MutationAccepted, RemoteError> {
        let mut state = self.state();
        state.updates.push(request.clone());
        state.update_response.take().unwrap_or_else(|| {
            Ok(MutationAccepted {
                stack_id: default_id(&request.stack_name),
            })
        })
    }
}
