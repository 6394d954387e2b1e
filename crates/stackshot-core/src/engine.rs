use crate::events::{EventConsumer, EventTracker};
use crate::lifecycle::StackPresence;
use crate::mutation::{create_request, update_request};
use crate::status::{terminal_outcome, TerminalOutcome};
use crate::wait::{SleepWaiter, WaitConfig, Waiter, DEFAULT_MAX_ATTEMPTS};
use crate::{CoreError, RemoteOperation};
use serde::Serialize;
use stackshot_remote::{StackApi, StackStatus};
use stackshot_schema::{StackConfig, StackId};
use tracing::{debug, info};

/// What `synchronize` submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
    /// The service reported the live stack already matches the configuration.
    NoChanges,
}

/// Result of a poll loop that reached a successful terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub status: StackStatus,
    /// Polls performed, including the one that saw the terminal status.
    pub attempts: u32,
    /// Events delivered to the consumer.
    pub events: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub outcome: SyncOutcome,
    /// `None` when there was nothing to observe.
    pub observation: Option<Observation>,
}

/// Reconciles one `StackConfig` against the live stack of the same name.
///
/// The engine borrows its configuration and remote handle for its whole
/// lifetime. It is single-threaded: every operation blocks on the remote call
/// in progress, and the poll loop blocks in its `Waiter` between polls.
pub struct Engine<'a> {
    api: &'a dyn StackApi,
    config: &'a StackConfig,
    presence: StackPresence,
    /// Id returned by an accepted create, used until the first successful reload.
    created_stack_id: Option<StackId>,
    tracker: EventTracker<'a>,
    waiter: Box<dyn Waiter + 'a>,
    max_attempts: u32,
}

impl<'a> Engine<'a> {
    /// Validate `config`, load the live stack, and prime the event marker so
    /// that only events emitted from now on are reported.
    ///
    /// A missing stack is not an error. Nothing is sent to the service if the
    /// configuration is invalid.
    pub fn load(api: &'a dyn StackApi, config: &'a StackConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let mut engine = Self {
            api,
            config,
            presence: StackPresence::Unknown,
            created_stack_id: None,
            tracker: EventTracker::new(api),
            waiter: Box::new(SleepWaiter::default()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        };
        engine.reload()?;
        if engine.presence.is_present() {
            engine.tracker.prime_marker()?;
        }
        Ok(engine)
    }

    #[must_use]
    pub fn with_waiter(mut self, waiter: impl Waiter + 'a) -> Self {
        self.waiter = Box::new(waiter);
        self
    }

    /// Bound the poll loop. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_wait_config(self, wait: WaitConfig) -> Self {
        self.with_waiter(SleepWaiter::new(wait.interval))
            .with_max_attempts(wait.max_attempts)
    }

    pub fn presence(&self) -> &StackPresence {
        &self.presence
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The remote-assigned id once known, from a describe or an accepted create.
    pub fn stack_id(&self) -> Option<&StackId> {
        self.presence.stack_id().or(self.created_stack_id.as_ref())
    }

    /// Refresh the live stack state.
    ///
    /// Looks the stack up by name until its id is known, then by id. A
    /// not-found response marks the stack absent.
    pub fn reload(&mut self) -> Result<&StackPresence, CoreError> {
        let key = match self.stack_id() {
            Some(id) => id.to_string(),
            None => self.config.name.clone(),
        };
        match self.api.describe_stack(&key) {
            Ok(snapshot) => {
                self.tracker.set_stack_id(snapshot.stack_id.clone());
                self.presence = StackPresence::Present(snapshot);
            }
            Err(e) if e.is_not_found() => {
                self.presence = StackPresence::Absent;
            }
            Err(source) => {
                return Err(CoreError::Remote {
                    operation: RemoteOperation::DescribeStack,
                    source,
                })
            }
        }
        debug!("stack {key} is {}", self.presence);
        Ok(&self.presence)
    }

    /// Create the stack if it is absent, update it otherwise.
    ///
    /// An update the service rejects as having nothing to change returns
    /// `SyncOutcome::NoChanges`.
    pub fn synchronize(&mut self) -> Result<SyncOutcome, CoreError> {
        if self.presence.is_present() {
            let request = update_request(self.config);
            info!("updating stack {}", request.stack_name);
            match self.api.update_stack(&request) {
                Ok(_) => Ok(SyncOutcome::Updated),
                Err(e) if e.is_no_updates() => {
                    info!("stack {} has no updates to apply", request.stack_name);
                    Ok(SyncOutcome::NoChanges)
                }
                Err(source) => Err(CoreError::Remote {
                    operation: RemoteOperation::UpdateStack,
                    source,
                }),
            }
        } else {
            let request = create_request(self.config)?;
            info!("creating stack {}", request.stack_name);
            let accepted = self
                .api
                .create_stack(&request)
                .map_err(CoreError::remote(RemoteOperation::CreateStack))?;
            debug!("create accepted, stack id {}", accepted.stack_id);
            self.tracker.set_stack_id(accepted.stack_id.clone());
            self.created_stack_id = Some(accepted.stack_id);
            Ok(SyncOutcome::Created)
        }
    }

    /// Poll until the stack reaches a terminal status or the attempt bound is
    /// exhausted, delivering new events to `consumer` on every poll.
    ///
    /// No wait follows the final attempt.
    pub fn observe_until_terminal(
        &mut self,
        consumer: &mut dyn EventConsumer,
    ) -> Result<Observation, CoreError> {
        let mut delivered = 0;
        for attempt in 1..=self.max_attempts {
            self.reload()?;
            delivered += self.tracker.pull_new(consumer)?;

            if let Some(snapshot) = self.presence.snapshot() {
                match terminal_outcome(&snapshot.stack_status) {
                    Some(TerminalOutcome::Success) => {
                        info!(
                            "stack {} reached {} after {attempt} attempt(s)",
                            snapshot.stack_name, snapshot.stack_status
                        );
                        return Ok(Observation {
                            status: snapshot.stack_status.clone(),
                            attempts: attempt,
                            events: delivered,
                        });
                    }
                    Some(TerminalOutcome::Failure) => {
                        return Err(CoreError::StackFailed {
                            stack: self.config.name.clone(),
                            status: snapshot.stack_status.clone(),
                            reason: snapshot.stack_status_reason.clone(),
                        });
                    }
                    None => {}
                }
            }

            if attempt < self.max_attempts {
                self.waiter.wait();
            }
        }
        Err(CoreError::Timeout {
            stack: self.config.name.clone(),
            attempts: self.max_attempts,
        })
    }

    /// `synchronize`, then `observe_until_terminal` unless there was nothing
    /// to change. A failed submission is returned without observing.
    pub fn synchronize_and_observe(
        &mut self,
        consumer: &mut dyn EventConsumer,
    ) -> Result<Reconciliation, CoreError> {
        let outcome = self.synchronize()?;
        if outcome == SyncOutcome::NoChanges {
            return Ok(Reconciliation {
                outcome,
                observation: None,
            });
        }
        let observation = self.observe_until_terminal(consumer)?;
        Ok(Reconciliation {
            outcome,
            observation: Some(observation),
        })
    }
}
