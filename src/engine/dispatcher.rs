//! Single-listener intent dispatch.
//!
//! The dispatcher is the seam between the transport layer and the game
//! engine: routes publish UI-originated intents, and whichever phase is
//! currently active attaches a handler for the topics it understands. Each
//! topic holds at most one handler at a time; attaching replaces the previous
//! handler silently, and every phase detaches its handlers on exit so stale
//! listeners can never leak across phases.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

/// Topics an intent can be published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentTopic {
    /// Registration form submitted.
    Register,
    /// Answer submitted for the current round.
    Answer,
    /// Request to replay the current round's prompt.
    Replay,
    /// Forced termination of the active phase.
    End,
}

/// UI-originated intents routed into the active phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Registration form submitted.
    Register {
        /// Display name as typed.
        name: String,
        /// Email as typed; canonicalized downstream.
        email: String,
    },
    /// Free-text answer for the current round.
    Answer {
        /// Literal input, possibly empty.
        text: String,
    },
    /// Replay the current round's prompt.
    Replay,
    /// End the active phase.
    End,
}

impl Intent {
    /// Topic this intent is dispatched under.
    pub fn topic(&self) -> IntentTopic {
        match self {
            Intent::Register { .. } => IntentTopic::Register,
            Intent::Answer { .. } => IntentTopic::Answer,
            Intent::Replay => IntentTopic::Replay,
            Intent::End => IntentTopic::End,
        }
    }
}

/// Callback invoked synchronously with the published intent.
pub type IntentHandler = Arc<dyn Fn(Intent) + Send + Sync>;

/// Error returned when an intent is published with nobody listening.
///
/// This signals a sequencing defect (or an impatient client), never a crash:
/// callers log it and drop the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no active listener for topic {topic:?}")]
pub struct NoListener {
    /// Topic the dropped intent was published under.
    pub topic: IntentTopic,
}

/// Topic-keyed single-handler registry.
#[derive(Default)]
pub struct Dispatcher {
    listeners: DashMap<IntentTopic, IntentHandler>,
}

impl Dispatcher {
    /// Create a dispatcher with no listeners attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` for `topic`, silently replacing any previous handler.
    pub fn attach(&self, topic: IntentTopic, handler: IntentHandler) {
        self.listeners.insert(topic, handler);
    }

    /// Remove the handler for `topic`, if any.
    pub fn detach(&self, topic: IntentTopic) {
        self.listeners.remove(&topic);
    }

    /// Deliver `intent` to the handler attached for its topic.
    ///
    /// The handler is cloned out of the registry before it runs, so a handler
    /// may attach or detach listeners without deadlocking the dispatcher.
    pub fn publish(&self, intent: Intent) -> Result<(), NoListener> {
        let topic = intent.topic();
        let handler = self
            .listeners
            .get(&topic)
            .map(|entry| entry.value().clone())
            .ok_or(NoListener { topic })?;
        handler(intent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> IntentHandler {
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn publish_reaches_the_attached_handler() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        dispatcher.attach(IntentTopic::End, counting_handler(hits.clone()));

        dispatcher.publish(Intent::End).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_without_listener_is_a_reported_no_op() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher
            .publish(Intent::Answer { text: "git".into() })
            .unwrap_err();
        assert_eq!(err.topic, IntentTopic::Answer);
    }

    #[test]
    fn detach_stops_delivery_to_the_previous_handler() {
        let dispatcher = Dispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        dispatcher.attach(IntentTopic::Replay, counting_handler(hits.clone()));
        dispatcher.detach(IntentTopic::Replay);

        assert!(dispatcher.publish(Intent::Replay).is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn attach_replaces_the_previous_handler_silently() {
        let dispatcher = Dispatcher::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        dispatcher.attach(IntentTopic::End, counting_handler(first.clone()));
        dispatcher.attach(IntentTopic::End, counting_handler(second.clone()));

        dispatcher.publish(Intent::End).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_may_detach_themselves_while_handling() {
        let dispatcher = Arc::new(Dispatcher::new());
        let inner = dispatcher.clone();
        dispatcher.attach(
            IntentTopic::End,
            Arc::new(move |_| inner.detach(IntentTopic::End)),
        );

        dispatcher.publish(Intent::End).unwrap();
        assert!(dispatcher.publish(Intent::End).is_err());
    }
}
