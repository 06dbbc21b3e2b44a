//! Traversal event pipeline: an ordered listener registry with per-listener
//! failure isolation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use personlink_shared::{ParagraphLink, PersonConnection, PersonDetails, PersonLinkError, Result};

/// Receives traversal events. Every method defaults to a no-op, so a listener
/// only implements the events it cares about.
#[async_trait]
pub trait TraversalListener: Send + Sync {
    /// Name used when reporting failures.
    fn name(&self) -> &str;

    /// The source page produced `count` candidate links.
    async fn on_candidate_count(&self, _source_url: &str, _count: usize) -> Result<()> {
        Ok(())
    }

    /// A candidate was probed; `resolved` tells whether it was a person.
    async fn on_candidate_probed(&self, _candidate: &ParagraphLink, _resolved: bool) -> Result<()> {
        Ok(())
    }

    /// `person` links to `connection.connection_person`.
    async fn on_connection_found(
        &self,
        _person: &PersonDetails,
        _connection: &PersonConnection,
    ) -> Result<()> {
        Ok(())
    }
}

/// Handle returned by [`EventPipeline::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// The event a listener failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerEvent {
    CandidateCount,
    CandidateProbed,
    ConnectionFound,
}

impl fmt::Display for ListenerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListenerEvent::CandidateCount => "candidate-count",
            ListenerEvent::CandidateProbed => "candidate-probed",
            ListenerEvent::ConnectionFound => "connection-found",
        };
        f.write_str(name)
    }
}

/// A listener error, isolated from the other listeners and the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub listener: String,
    pub event: ListenerEvent,
    pub message: String,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listener '{}' failed on {}: {}",
            self.listener, self.event, self.message
        )
    }
}

impl From<ListenerFailure> for PersonLinkError {
    fn from(failure: ListenerFailure) -> Self {
        PersonLinkError::listener(
            failure.listener,
            format!("{} ({})", failure.message, failure.event),
        )
    }
}

/// Insertion-ordered listener registry. Dispatch is sequential in
/// registration order.
#[derive(Default)]
pub struct EventPipeline {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Arc<dyn TraversalListener>>,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registering the same instance again keeps its
    /// original position and returns the original handle.
    pub fn add_listener(&mut self, listener: Arc<dyn TraversalListener>) -> ListenerId {
        if let Some((id, _)) = self
            .listeners
            .iter()
            .find(|(_, existing)| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&listener)))
        {
            return *id;
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.insert(id, listener);
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub async fn notify_candidate_count(&self, source_url: &str, count: usize) -> Vec<ListenerFailure> {
        let mut failures = Vec::new();
        for listener in self.listeners.values() {
            let result = listener.on_candidate_count(source_url, count).await;
            record(&mut failures, listener.as_ref(), ListenerEvent::CandidateCount, result);
        }
        failures
    }

    pub async fn notify_candidate_probed(
        &self,
        candidate: &ParagraphLink,
        resolved: bool,
    ) -> Vec<ListenerFailure> {
        let mut failures = Vec::new();
        for listener in self.listeners.values() {
            let result = listener.on_candidate_probed(candidate, resolved).await;
            record(&mut failures, listener.as_ref(), ListenerEvent::CandidateProbed, result);
        }
        failures
    }

    pub async fn notify_connection_found(
        &self,
        person: &PersonDetails,
        connection: &PersonConnection,
    ) -> Vec<ListenerFailure> {
        let mut failures = Vec::new();
        for listener in self.listeners.values() {
            let result = listener.on_connection_found(person, connection).await;
            record(&mut failures, listener.as_ref(), ListenerEvent::ConnectionFound, result);
        }
        failures
    }
}

fn record(
    failures: &mut Vec<ListenerFailure>,
    listener: &dyn TraversalListener,
    event: ListenerEvent,
    result: Result<()>,
) {
    if let Err(e) = result {
        warn!(listener = listener.name(), %event, error = %e, "listener failed");
        failures.push(ListenerFailure {
            listener: listener.name().to_string(),
            event,
            message: e.to_string(),
        });
    }
}
