use super::client::{GenerationBackend, GenerationRequest};
use crate::error::ServiceError;
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

enum MockOutcome {
    Text(String),
    Failure(String),
    Panic,
}

/// One scripted answer. Replies are matched by instruction substring, not call order,
/// because concurrently dispatched requests reach the backend in any order.
pub struct MockReply {
    needle: Option<String>,
    outcome: MockOutcome,
    delay: Option<Duration>,
    gate: Option<oneshot::Receiver<()>>,
}

/// Holds a gated reply back until released (or dropped).
pub struct MockGate(oneshot::Sender<()>);

impl MockGate {
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Text(text.into()))
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Failure(message.into()))
    }

    /// Panics inside the backend call.
    pub fn panic() -> Self {
        Self::with_outcome(MockOutcome::Panic)
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            needle: None,
            outcome,
            delay: None,
            gate: None,
        }
    }

    pub fn matching(mut self, needle: impl Into<String>) -> Self {
        self.needle = Some(needle.into());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn gated(mut self) -> (Self, MockGate) {
        let (tx, rx) = oneshot::channel();
        self.gate = Some(rx);
        (self, MockGate(tx))
    }

    fn matches(&self, instruction: &str) -> bool {
        self.needle
            .as_deref()
            .map_or(true, |needle| instruction.contains(needle))
    }
}

#[derive(Clone)]
pub struct MockBackend {
    replies: Arc<Mutex<Vec<MockReply>>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockBackend {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(reply);
    }

    /// Every request seen so far, in arrival order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn take_reply(&self, instruction: &str) -> Option<MockReply> {
        let mut replies = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let index = replies.iter().position(|reply| reply.matches(instruction))?;
        Some(replies.remove(index))
    }

    async fn answer(&self, request: GenerationRequest) -> Result<String, ServiceError> {
        let reply = self.take_reply(&request.instruction);
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        let Some(reply) = reply else {
            return Err(ServiceError::new("MockBackend: no scripted reply matches"));
        };

        if let Some(gate) = reply.gate {
            // A dropped gate releases the reply as well.
            let _ = gate.await;
        }
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }

        match reply.outcome {
            MockOutcome::Text(text) => Ok(text),
            MockOutcome::Failure(message) => Err(ServiceError::new(message)),
            MockOutcome::Panic => panic!("MockBackend: scripted panic"),
        }
    }
}

impl GenerationBackend for MockBackend {
    fn generate(&self, request: GenerationRequest) -> BoxFuture<'_, Result<String, ServiceError>> {
        self.answer(request).boxed()
    }
}
