use crate::{CoreError, RemoteOperation};
use chrono::{DateTime, Utc};
use stackshot_remote::{StackApi, StackEvent};
use stackshot_schema::{EventId, StackId};
use std::collections::HashSet;
use tracing::debug;

pub type ConsumerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives stack events in chronological order.
///
/// An error aborts the observation in progress and is returned to the caller
/// as `CoreError::Consumer`.
pub trait EventConsumer {
    fn consume(&mut self, event: &StackEvent) -> Result<(), ConsumerError>;
}

impl<F> EventConsumer for F
where
    F: FnMut(&StackEvent) -> Result<(), ConsumerError>,
{
    fn consume(&mut self, event: &StackEvent) -> Result<(), ConsumerError> {
        self(event)
    }
}

/// The most recent event already handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSeenMarker {
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
}

impl From<&StackEvent> for LastSeenMarker {
    fn from(event: &StackEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            timestamp: event.timestamp,
        }
    }
}

/// Pulls the events a stack emitted since the last pull.
pub struct EventTracker<'a> {
    api: &'a dyn StackApi,
    stack_id: Option<StackId>,
    marker: Option<LastSeenMarker>,
}

impl<'a> EventTracker<'a> {
    pub fn new(api: &'a dyn StackApi) -> Self {
        Self {
            api,
            stack_id: None,
            marker: None,
        }
    }

    pub fn set_stack_id(&mut self, stack_id: StackId) {
        self.stack_id = Some(stack_id);
    }

    pub fn marker(&self) -> Option<&LastSeenMarker> {
        self.marker.as_ref()
    }

    /// Record the stack's most recent event as already seen.
    ///
    /// A stack without an id yet, without history, or that the service
    /// reports as missing leaves the marker unset.
    pub fn prime_marker(&mut self) -> Result<(), CoreError> {
        let Some(stack_id) = self.stack_id.as_ref() else {
            return Ok(());
        };
        let page = match self.api.describe_events_page(stack_id, None) {
            Ok(page) => page,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(source) => {
                return Err(CoreError::Remote {
                    operation: RemoteOperation::DescribeEvents,
                    source,
                })
            }
        };
        if let Some(latest) = page.events.first() {
            debug!("event marker primed at {}", latest.event_id);
            self.marker = Some(LastSeenMarker::from(latest));
        }
        Ok(())
    }

    /// Deliver every event newer than the marker to `consumer`, oldest first,
    /// and return how many were delivered.
    ///
    /// Pages are fetched most recent first until the marker is reached or the
    /// history ends. A remote error fails the pull before anything is
    /// delivered. The marker advances with each delivered event, so a consumer
    /// error leaves it on the last event the consumer accepted.
    pub fn pull_new(&mut self, consumer: &mut dyn EventConsumer) -> Result<usize, CoreError> {
        let Some(stack_id) = self.stack_id.clone() else {
            return Ok(0);
        };

        let mut fresh = Vec::new();
        let mut seen = HashSet::new();
        let mut next_token: Option<String> = None;
        'pages: loop {
            let page = self
                .api
                .describe_events_page(&stack_id, next_token.as_deref())
                .map_err(CoreError::remote(RemoteOperation::DescribeEvents))?;
            for event in page.events {
                if self
                    .marker
                    .as_ref()
                    .is_some_and(|m| m.event_id == event.event_id)
                {
                    break 'pages;
                }
                if seen.insert(event.event_id.clone()) {
                    fresh.push(event);
                }
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        fresh.reverse();
        // Stable: events sharing a timestamp keep the service's order.
        fresh.sort_by_key(|e| e.timestamp);
        if let Some(marker) = &self.marker {
            fresh.retain(|e| e.timestamp >= marker.timestamp);
        }

        for event in &fresh {
            consumer.consume(event).map_err(CoreError::Consumer)?;
            self.marker = Some(LastSeenMarker::from(event));
        }
        if !fresh.is_empty() {
            debug!("delivered {} new event(s) for {stack_id}", fresh.len());
        }
        Ok(fresh.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stackshot_remote::{MockStackApi, RemoteError};

    fn event(n: u32) -> StackEvent {
        event_at(n, n)
    }

    fn event_at(n: u32, second: u32) -> StackEvent {
        StackEvent {
            event_id: format!("evt-{n}").into(),
            stack_id: "arn:stack/web/1".into(),
            stack_name: "web".to_owned(),
            timestamp: Utc
                .timestamp_opt(1_700_000_000 + i64::from(second), 0)
                .unwrap(),
            logical_resource_id: format!("Resource{n}"),
            physical_resource_id: None,
            resource_type: "AWS::S3::Bucket".to_owned(),
            resource_status: "CREATE_IN_PROGRESS".to_owned(),
            resource_status_reason: None,
        }
    }

    fn tracker(api: &MockStackApi) -> EventTracker<'_> {
        let mut tracker = EventTracker::new(api);
        tracker.set_stack_id(StackId::new("arn:stack/web/1"));
        tracker
    }

    fn collect(tracker: &mut EventTracker<'_>) -> Result<Vec<String>, CoreError> {
        let mut ids = Vec::new();
        let mut consumer = |e: &StackEvent| -> Result<(), ConsumerError> {
            ids.push(e.event_id.to_string());
            Ok(())
        };
        tracker.pull_new(&mut consumer)?;
        Ok(ids)
    }

    #[test]
    fn unprimed_tracker_delivers_everything_in_order() {
        let api = MockStackApi::new().with_page_size(2);
        api.record_events((1..=5).map(event));
        let mut tracker = tracker(&api);

        assert_eq!(
            collect(&mut tracker).unwrap(),
            vec!["evt-1", "evt-2", "evt-3", "evt-4", "evt-5"]
        );
        assert_eq!(tracker.marker().unwrap().event_id, "evt-5");
    }

    #[test]
    fn primed_on_latest_event_delivers_nothing() {
        let api = MockStackApi::new();
        api.record_events((1..=3).map(event));
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();
        assert_eq!(tracker.marker().unwrap().event_id, "evt-3");
        assert!(collect(&mut tracker).unwrap().is_empty());
    }

    #[test]
    fn successive_pulls_never_repeat_events() {
        let api = MockStackApi::new().with_page_size(2);
        api.record_events((1..=2).map(event));
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();

        api.record_events((3..=6).map(event));
        assert_eq!(
            collect(&mut tracker).unwrap(),
            vec!["evt-3", "evt-4", "evt-5", "evt-6"]
        );

        api.record_events([event(7)]);
        assert_eq!(collect(&mut tracker).unwrap(), vec!["evt-7"]);
        assert!(collect(&mut tracker).unwrap().is_empty());
    }

    #[test]
    fn scan_stops_at_marker_without_reading_older_pages() {
        let api = MockStackApi::new().with_page_size(2);
        api.record_events((1..=10).map(event));
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();
        api.record_events([event(11)]);

        let before = api.events_calls().len();
        assert_eq!(collect(&mut tracker).unwrap(), vec!["evt-11"]);
        assert_eq!(api.events_calls().len() - before, 1);
    }

    #[test]
    fn empty_history_is_a_no_op() {
        let api = MockStackApi::new();
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();
        assert!(tracker.marker().is_none());
        assert!(collect(&mut tracker).unwrap().is_empty());
    }

    #[test]
    fn prime_on_missing_stack_is_a_no_op() {
        let api = MockStackApi::new();
        api.fail_next_events(RemoteError::StackNotFound("gone".to_owned()));
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();
        assert!(tracker.marker().is_none());
    }

    #[test]
    fn tracker_without_stack_id_does_not_call_remote() {
        let api = MockStackApi::new();
        let mut tracker = EventTracker::new(&api);
        tracker.prime_marker().unwrap();
        assert!(collect(&mut tracker).unwrap().is_empty());
        assert!(api.events_calls().is_empty());
    }

    #[test]
    fn remote_error_leaves_marker_untouched() {
        let api = MockStackApi::new();
        api.record_events([event(1)]);
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();
        api.record_events([event(2)]);
        api.fail_next_events(RemoteError::Http("throttled".to_owned()));

        let err = collect(&mut tracker).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Remote {
                operation: RemoteOperation::DescribeEvents,
                ..
            }
        ));
        assert_eq!(tracker.marker().unwrap().event_id, "evt-1");
        assert_eq!(collect(&mut tracker).unwrap(), vec!["evt-2"]);
    }

    #[test]
    fn consumer_error_aborts_and_keeps_delivered_events() {
        let api = MockStackApi::new();
        api.record_events((1..=3).map(event));
        let mut tracker = tracker(&api);

        let mut delivered = Vec::new();
        let mut consumer = |e: &StackEvent| -> Result<(), ConsumerError> {
            if e.event_id == "evt-2" {
                return Err("sink closed".into());
            }
            delivered.push(e.event_id.to_string());
            Ok(())
        };
        let err = tracker.pull_new(&mut consumer).unwrap_err();
        assert!(matches!(err, CoreError::Consumer(_)));
        assert_eq!(delivered, vec!["evt-1"]);
        assert_eq!(tracker.marker().unwrap().event_id, "evt-1");
    }

    #[test]
    fn duplicate_ids_across_shifting_pages_are_dropped() {
        struct ShiftingApi {
            inner: MockStackApi,
        }
        impl StackApi for ShiftingApi {
            fn describe_stack(
                &self,
                name_or_id: &str,
            ) -> Result<stackshot_remote::StackSnapshot, RemoteError> {
                self.inner.describe_stack(name_or_id)
            }
            fn describe_events_page(
                &self,
                name_or_id: &str,
                next_token: Option<&str>,
            ) -> Result<stackshot_remote::EventPage, RemoteError> {
                let mut page = self.inner.describe_events_page(name_or_id, next_token)?;
                // A new event arrived between page fetches and pushed evt-2
                // onto the second page as well.
                if next_token.is_some() {
                    page.events.insert(0, event(2));
                }
                Ok(page)
            }
            fn create_stack(
                &self,
                request: &stackshot_remote::CreateStackRequest,
            ) -> Result<stackshot_remote::MutationAccepted, RemoteError> {
                self.inner.create_stack(request)
            }
            fn update_stack(
                &self,
                request: &stackshot_remote::UpdateStackRequest,
            ) -> Result<stackshot_remote::MutationAccepted, RemoteError> {
                self.inner.update_stack(request)
            }
        }

        let api = ShiftingApi {
            inner: MockStackApi::new().with_page_size(2),
        };
        api.inner.record_events((1..=3).map(event));
        let mut tracker = EventTracker::new(&api);
        tracker.set_stack_id(StackId::new("arn:stack/web/1"));

        assert_eq!(
            collect(&mut tracker).unwrap(),
            vec!["evt-1", "evt-2", "evt-3"]
        );
    }

    #[test]
    fn out_of_order_pages_are_delivered_chronologically() {
        let api = MockStackApi::new();
        // Recorded out of order; the service's ordering is not trusted blindly.
        api.record_events([event_at(1, 10), event_at(2, 30), event_at(3, 20)]);
        let mut tracker = tracker(&api);
        assert_eq!(
            collect(&mut tracker).unwrap(),
            vec!["evt-1", "evt-3", "evt-2"]
        );
    }

    #[test]
    fn events_older_than_marker_are_dropped() {
        let api = MockStackApi::new();
        api.record_events([event_at(1, 50)]);
        let mut tracker = tracker(&api);
        tracker.prime_marker().unwrap();

        // A late-indexed event with an older timestamp appears above the marker.
        api.record_events([event_at(2, 40), event_at(3, 60)]);
        assert_eq!(collect(&mut tracker).unwrap(), vec!["evt-3"]);
    }
}
