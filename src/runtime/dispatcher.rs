use super::request::{ActionRequest, RequestId};
use crate::api::GenerationClient;
use crate::error::{ActionError, ActionResult};
use crate::prompt::build_instruction;
use crate::state::SessionHistory;
use std::sync::Arc;
use tokio::runtime::{Handle, TryCurrentError};
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A background unit was spawned; the callback fires when it finishes.
    Spawned,
    /// The callback already ran with an error; nothing was spawned.
    FailedFast,
}

/// Owns a completion callback and guarantees it runs exactly once.
///
/// If the unit ends without delivering (the backend panicked), `Drop` delivers a
/// service error instead.
struct CompletionGuard<F>
where
    F: FnOnce(ActionResult),
{
    request_id: RequestId,
    on_complete: Option<F>,
}

impl<F> CompletionGuard<F>
where
    F: FnOnce(ActionResult),
{
    fn new(request_id: RequestId, on_complete: F) -> Self {
        Self {
            request_id,
            on_complete: Some(on_complete),
        }
    }

    fn complete(mut self, result: ActionResult) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }
}

impl<F> Drop for CompletionGuard<F>
where
    F: FnOnce(ActionResult),
{
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            tracing::error!(request = %self.request_id, "background unit ended without a result");
            on_complete(Err(ActionError::service(
                "background task ended without a result",
            )));
        }
    }
}

/// Turns action requests into fire-and-forget background calls.
///
/// Every dispatch spawns a fresh unit: no pool, no admission limit, no cancellation,
/// no timeout. Units are tracked only so callers can count or await them.
pub struct RequestDispatcher {
    client: Arc<GenerationClient>,
    history: SessionHistory,
    tracker: TaskTracker,
    runtime: Handle,
}

impl RequestDispatcher {
    /// Binds to the ambient tokio runtime.
    pub fn new(client: GenerationClient, history: SessionHistory) -> Result<Self, TryCurrentError> {
        Ok(Self::with_handle(client, history, Handle::try_current()?))
    }

    pub fn with_handle(client: GenerationClient, history: SessionHistory, runtime: Handle) -> Self {
        Self {
            client: Arc::new(client),
            history,
            tracker: TaskTracker::new(),
            runtime,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    pub fn client(&self) -> Arc<GenerationClient> {
        Arc::clone(&self.client)
    }

    /// Later dispatches use `client`; units already running keep the one they started with.
    pub fn set_client(&mut self, client: GenerationClient) {
        self.client = Arc::new(client);
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Units spawned and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits until every unit spawned so far has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Never blocks. `on_complete` runs exactly once: synchronously for
    /// `NotConfigured`/`EmptyInput`, otherwise on whichever worker ran the call.
    pub fn dispatch<F>(&self, request: &ActionRequest, on_complete: F) -> DispatchOutcome
    where
        F: FnOnce(ActionResult) + Send + 'static,
    {
        let request_id = request.id();

        if !self.client.is_ready() {
            tracing::warn!(request = %request_id, action = %request.kind(), "dispatch rejected: not configured");
            on_complete(Err(ActionError::NotConfigured));
            return DispatchOutcome::FailedFast;
        }
        if request.input().trim().is_empty() {
            tracing::debug!(request = %request_id, action = %request.kind(), "dispatch rejected: empty input");
            on_complete(Err(ActionError::EmptyInput));
            return DispatchOutcome::FailedFast;
        }

        let instruction = build_instruction(request.kind(), request.input());
        let client = Arc::clone(&self.client);
        let history = self.history.clone();
        let guard = CompletionGuard::new(request_id, on_complete);

        tracing::debug!(
            request = %request_id,
            action = %request.kind(),
            in_flight = self.tracker.len(),
            "dispatching"
        );

        self.tracker.spawn_on(
            async move {
                match client.generate(&instruction).await {
                    Ok(text) => {
                        history.append(instruction, text.clone());
                        tracing::debug!(request = %request_id, chars = text.len(), "generation complete");
                        guard.complete(Ok(text));
                    }
                    Err(error) => {
                        tracing::error!(request = %request_id, %error, "generation failed");
                        guard.complete(Err(error.into()));
                    }
                }
            },
            &self.runtime,
        );

        DispatchOutcome::Spawned
    }
}
