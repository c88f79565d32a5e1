//! The editor-side state machine for AI actions.
//!
//! `Idle -> Capturing -> Dispatched -> Applying -> Idle`, or `Dispatched -> Failed -> Idle`.
//! Background units never touch the document: their callbacks only send a
//! [`Completion`] over this controller's channel, and the control context applies it
//! in [`EditorActionController::drain_completions`] or
//! [`EditorActionController::next_completion`].

use crate::api::GenerationClient;
use crate::config::Config;
use crate::error::ActionError;
use crate::prompt::{ActionKind, Destination, DocumentType, InputScope};
use crate::runtime::{
    route_reply, ActionRequest, Applied, BusyBoard, BusyHandle, CapturedRange, Completion,
    DispatchOutcome, RequestDispatcher, RequestId,
};
use crate::state::{ConversationLog, DocumentSurface, Role, SessionHistory, TextDocument};
use std::collections::HashMap;
use tokio::runtime::TryCurrentError;
use tokio::sync::mpsc;

const SUBSTITUTED_ACK: &str = "Text processed successfully";
const DOCUMENT_ACK: &str = "Document created";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Capturing,
    Dispatched,
    Applying,
    Failed,
}

/// User-visible signals the UI layer should surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NothingToDo,
    SelectionRequired,
    Error(String),
}

struct PendingRequest {
    request: ActionRequest,
    busy: BusyHandle,
}

pub struct EditorActionController<D: DocumentSurface = TextDocument> {
    document: D,
    conversation: ConversationLog,
    busy: BusyBoard,
    dispatcher: RequestDispatcher,
    pending: HashMap<RequestId, PendingRequest>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    state: ControllerState,
    notices: Vec<Notice>,
}

impl<D: DocumentSurface> EditorActionController<D> {
    /// Must be called inside a tokio runtime.
    pub fn new(document: D, client: GenerationClient) -> Result<Self, TryCurrentError> {
        let dispatcher = RequestDispatcher::new(client, SessionHistory::new())?;
        Ok(Self::with_dispatcher(document, dispatcher))
    }

    pub fn with_dispatcher(document: D, dispatcher: RequestDispatcher) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            document,
            conversation: ConversationLog::new(),
            busy: BusyBoard::new(),
            dispatcher,
            pending: HashMap::new(),
            completion_tx,
            completion_rx,
            state: ControllerState::Idle,
            notices: Vec::new(),
        }
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.conversation
    }

    pub fn history(&self) -> &SessionHistory {
        self.dispatcher.history()
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn status_text(&self) -> &str {
        self.busy.status_text()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Rebuilds the client from `config`. Requests already in flight finish on the old one.
    pub fn apply_config(&mut self, config: &Config) {
        self.dispatcher.set_client(GenerationClient::new(config));
    }

    pub fn set_client(&mut self, client: GenerationClient) {
        self.dispatcher.set_client(client);
    }

    /// Clears the session history and the conversation log.
    pub fn clear_history(&mut self) {
        let removed = self.dispatcher.history().clear();
        self.conversation.clear();
        tracing::debug!(removed, "session history cleared");
    }

    /// Runs `kind` on the current selection, or on the whole document when the action allows it.
    pub fn trigger(&mut self, kind: ActionKind) -> Option<RequestId> {
        self.transition(ControllerState::Capturing);

        let selected = self
            .document
            .selection()
            .and_then(|range| Some((self.document.text().get(range.clone())?.to_string(), range)));

        let captured = match selected {
            Some((text, range)) => Some((text.clone(), CapturedRange::Span { range, text })),
            None if kind.scope() == InputScope::SelectionOnly => None,
            None => Some((
                self.document.text().to_string(),
                CapturedRange::WholeDocument,
            )),
        };

        let Some((input, target)) = captured else {
            self.reject(Notice::SelectionRequired);
            return None;
        };
        self.start(kind, input, target)
    }

    /// Runs `kind` on typed input that has no document origin.
    pub fn submit(&mut self, kind: ActionKind, input: &str) -> Option<RequestId> {
        self.transition(ControllerState::Capturing);
        if kind == ActionKind::Chat && !input.trim().is_empty() {
            self.conversation.push(Role::User, input);
        }
        self.start(kind, input.to_string(), CapturedRange::None)
    }

    pub fn send_chat(&mut self, message: &str) -> Option<RequestId> {
        self.submit(ActionKind::Chat, message)
    }

    pub fn generate_document(&mut self, doc_type: DocumentType, description: &str) -> Option<RequestId> {
        self.submit(ActionKind::GenerateDocument { doc_type }, description)
    }

    /// Answers `question` using the selection, or the whole document, as context.
    pub fn ask(&mut self, question: &str) -> Option<RequestId> {
        let context = self
            .document
            .selected_text()
            .unwrap_or_else(|| self.document.text())
            .to_string();
        self.submit(ActionKind::AnswerQuestion { context }, question)
    }

    fn start(&mut self, kind: ActionKind, input: String, target: CapturedRange) -> Option<RequestId> {
        if input.trim().is_empty() {
            self.reject(Notice::NothingToDo);
            return None;
        }

        let request = ActionRequest::new(kind, input, target);
        let request_id = request.id();
        let busy = self.busy.show(request_id, request.kind().entry().busy_message);

        let completion_tx = self.completion_tx.clone();
        let outcome = self.dispatcher.dispatch(&request, move |result| {
            // The receiver lives as long as the controller; a closed channel means it is gone.
            let _ = completion_tx.send(Completion { request_id, result });
        });
        if outcome == DispatchOutcome::Spawned {
            tracing::debug!(request = %request_id, action = %request.kind(), "action dispatched");
        }

        self.pending.insert(request_id, PendingRequest { request, busy });
        self.transition(ControllerState::Dispatched);
        Some(request_id)
    }

    fn reject(&mut self, notice: Notice) {
        tracing::debug!(?notice, "action not dispatched");
        self.notices.push(notice);
        self.settle_state();
    }

    /// Applies every completion that has already arrived. Never waits.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.apply_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Waits for one completion and applies it. Returns false when nothing is pending.
    pub async fn next_completion(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        match self.completion_rx.recv().await {
            Some(completion) => {
                self.apply_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Applies completions until no request is pending.
    pub async fn settle(&mut self) {
        while self.next_completion().await {}
    }

    fn apply_completion(&mut self, completion: Completion) {
        let Completion { request_id, result } = completion;
        let Some(PendingRequest { request, busy }) = self.pending.remove(&request_id) else {
            tracing::warn!(request = %request_id, "completion for unknown request ignored");
            return;
        };

        match result {
            Ok(reply) => {
                self.transition(ControllerState::Applying);
                let destination = request.kind().destination();
                let applied = route_reply(
                    destination,
                    request.target(),
                    &reply,
                    &mut self.document,
                    &mut self.conversation,
                );
                match destination {
                    Destination::Substitute => self.conversation.push(Role::Assistant, SUBSTITUTED_ACK),
                    Destination::ReplaceDocument => self.conversation.push(Role::Assistant, DOCUMENT_ACK),
                    Destination::Conversation => {}
                }
                tracing::debug!(request = %request_id, ?applied, "reply applied");
                if applied == Applied::Appended {
                    if let CapturedRange::Span { .. } = request.target() {
                        tracing::info!(request = %request_id, "selection moved before reply arrived; appended instead");
                    }
                }
            }
            Err(error) => {
                self.transition(ControllerState::Failed);
                self.report_error(&request, &error);
            }
        }

        self.busy.dismiss(busy);
        self.settle_state();
    }

    fn report_error(&mut self, request: &ActionRequest, error: &ActionError) {
        tracing::warn!(request = %request.id(), action = %request.kind(), %error, "action failed");
        let message = error.to_string();
        self.conversation.push(Role::System, format!("Error: {message}"));
        self.notices.push(Notice::Error(message));
    }

    fn settle_state(&mut self) {
        let next = if self.pending.is_empty() {
            ControllerState::Idle
        } else {
            ControllerState::Dispatched
        };
        self.transition(next);
    }

    fn transition(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::trace!(from = ?self.state, to = ?next, "controller state");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockBackend, MockReply};
    use crate::prompt::{build_instruction, RewriteStyle};
    use std::sync::Arc;

    fn controller(text: &str, replies: Vec<MockReply>) -> (EditorActionController, MockBackend) {
        let backend = MockBackend::new(replies);
        let client = GenerationClient::with_backend(&Config::with_api_key("key"), Arc::new(backend.clone()));
        let controller =
            EditorActionController::new(TextDocument::from_text(text), client).expect("runtime");
        (controller, backend)
    }

    #[tokio::test]
    async fn test_rewrite_formal_replaces_selection() {
        let (mut ctl, backend) = controller(
            "Note: hey whats up",
            vec![MockReply::text("Good day. How are you?")],
        );
        assert!(ctl.document_mut().select_text("hey whats up"));

        let kind = ActionKind::Rewrite {
            style: RewriteStyle::parse("formal"),
        };
        ctl.trigger(kind.clone()).expect("dispatched");
        assert_eq!(ctl.state(), ControllerState::Dispatched);
        assert!(ctl.is_busy());
        assert_eq!(ctl.status_text(), "Rewriting text...");

        ctl.settle().await;

        assert_eq!(ctl.document().text(), "Note: Good day. How are you?");
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(!ctl.is_busy());

        let entries = ctl.history().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prompt, build_instruction(&kind, "hey whats up"));
        assert!(entries[0].prompt.contains("formal"));
        assert_eq!(entries[0].response, "Good day. How are you?");
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(
            ctl.conversation().last().map(|m| m.text.as_str()),
            Some(SUBSTITUTED_ACK)
        );
    }

    #[tokio::test]
    async fn test_selection_only_action_without_selection_is_rejected() {
        let (mut ctl, backend) = controller("some text", vec![]);
        assert_eq!(ctl.trigger(ActionKind::Improve), None);
        assert_eq!(ctl.take_notices(), vec![Notice::SelectionRequired]);
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(!ctl.is_busy());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_input_never_dispatches() {
        let (mut ctl, backend) = controller("   \n\t  ", vec![MockReply::text("x")]);
        ctl.document_mut().select_all();
        assert_eq!(ctl.trigger(ActionKind::FixGrammar), None);
        ctl.document_mut().clear_selection();
        assert_eq!(ctl.trigger(ActionKind::Summarize), None);
        assert_eq!(ctl.send_chat("  "), None);

        assert_eq!(
            ctl.take_notices(),
            vec![Notice::NothingToDo, Notice::NothingToDo, Notice::NothingToDo]
        );
        assert_eq!(ctl.dispatcher().in_flight(), 0);
        assert!(backend.calls().is_empty());
        assert!(ctl.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_continue_without_selection_appends() {
        let (mut ctl, _backend) = controller(
            "Once upon a time",
            vec![MockReply::text("there lived a crab.")],
        );
        ctl.trigger(ActionKind::Continue).expect("dispatched");
        ctl.settle().await;
        assert_eq!(ctl.document().text(), "Once upon a time\n\nthere lived a crab.");
    }

    #[tokio::test]
    async fn test_not_configured_surfaces_error_and_returns_idle() {
        let client = GenerationClient::new(&Config::with_api_key("YOUR_API_KEY_HERE"));
        let mut ctl =
            EditorActionController::new(TextDocument::from_text("text"), client).expect("runtime");
        ctl.trigger(ActionKind::Summarize).expect("request created");
        assert_eq!(ctl.dispatcher().in_flight(), 0);

        // The fast-fail completion is already queued.
        assert_eq!(ctl.drain_completions(), 1);
        assert_eq!(ctl.state(), ControllerState::Idle);
        assert!(!ctl.is_busy());
        assert_eq!(ctl.document().text(), "text");
        let notices = ctl.take_notices();
        assert_eq!(notices, vec![Notice::Error(ActionError::NotConfigured.to_string())]);
        assert_eq!(ctl.conversation().last().map(|m| m.role), Some(Role::System));
    }

    #[tokio::test]
    async fn test_service_error_leaves_document_untouched() {
        let (mut ctl, _backend) = controller("draft", vec![MockReply::failure("503 overloaded")]);
        ctl.document_mut().select_all();
        ctl.trigger(ActionKind::Expand).expect("dispatched");
        ctl.settle().await;

        assert_eq!(ctl.document().text(), "draft");
        assert!(ctl.history().is_empty());
        assert_eq!(ctl.state(), ControllerState::Idle);
        let notices = ctl.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(matches!(&notices[0], Notice::Error(m) if m.contains("503 overloaded")));
    }

    #[tokio::test]
    async fn test_chat_and_generate_document_destinations() {
        let (mut ctl, _backend) = controller(
            "old body",
            vec![
                MockReply::text("Hi! How can I help?").matching("hello there"),
                MockReply::text("Dear hiring manager,").matching("cover letter"),
            ],
        );
        ctl.send_chat("hello there").expect("chat dispatched");
        ctl.generate_document(DocumentType::Letter, "cover letter for a baker")
            .expect("generation dispatched");
        ctl.settle().await;

        let log = ctl.conversation();
        assert_eq!(log.messages()[0].role, Role::User);
        assert_eq!(log.messages()[0].text, "hello there");
        assert!(log
            .messages()
            .iter()
            .any(|m| m.role == Role::Assistant && m.text == "Hi! How can I help?"));
        assert!(log.messages().iter().any(|m| m.text == DOCUMENT_ACK));
        assert_eq!(ctl.document().text(), "Dear hiring manager,");
        assert_eq!(ctl.history().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_uses_selection_as_context() {
        let (mut ctl, backend) = controller(
            "Intro. The launch is on Friday. Outro.",
            vec![MockReply::text("Friday.")],
        );
        ctl.document_mut().select_text("The launch is on Friday.");
        ctl.ask("When is the launch?").expect("dispatched");
        ctl.settle().await;

        let calls = backend.calls();
        assert!(calls[0].instruction.contains("CONTEXT:\nThe launch is on Friday."));
        assert!(calls[0].instruction.contains("QUESTION:\nWhen is the launch?"));
        assert_eq!(ctl.document().text(), "Intro. The launch is on Friday. Outro.");
        assert_eq!(
            ctl.conversation().last_from(Role::Assistant).map(|m| m.text.as_str()),
            Some("Friday.")
        );
    }

    #[tokio::test]
    async fn test_user_edit_before_reply_falls_back_to_append() {
        let (reply, gate) = MockReply::text("BETA").gated();
        let (mut ctl, _backend) = controller("alpha beta", vec![reply]);
        ctl.document_mut().select_text("beta");
        ctl.trigger(ActionKind::Improve).expect("dispatched");

        // User keeps typing at the start while the request is in flight.
        ctl.document_mut().set_cursor(0);
        ctl.document_mut().insert_str("> ");
        gate.release();
        ctl.settle().await;

        assert_eq!(ctl.document().text(), "> alpha beta\n\nBETA");
    }

    #[tokio::test]
    async fn test_applied_result_is_one_undo_step() {
        let (mut ctl, _backend) = controller("fix thsi", vec![MockReply::text("fix this")]);
        ctl.document_mut().select_all();
        ctl.trigger(ActionKind::FixGrammar).expect("dispatched");
        ctl.settle().await;
        assert_eq!(ctl.document().text(), "fix this");
        assert!(ctl.document_mut().undo());
        assert_eq!(ctl.document().text(), "fix thsi");
    }

    #[tokio::test]
    async fn test_clear_history_empties_log_and_history() {
        let (mut ctl, _backend) = controller("", vec![MockReply::text("pong")]);
        ctl.send_chat("ping").expect("dispatched");
        ctl.settle().await;
        assert_eq!(ctl.history().len(), 1);
        ctl.clear_history();
        assert!(ctl.history().is_empty());
        assert!(ctl.conversation().is_empty());
    }

    #[tokio::test]
    async fn test_apply_config_rebuilds_client() {
        let (mut ctl, _backend) = controller("text", vec![]);
        assert!(ctl.dispatcher().is_ready());
        ctl.apply_config(&Config::with_api_key("unset"));
        assert!(!ctl.dispatcher().is_ready());
    }
}
