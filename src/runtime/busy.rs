use super::request::RequestId;
use std::collections::BTreeMap;

/// Proof of one shown busy indicator. Not `Clone`: exactly one owner may dismiss it.
#[derive(Debug, PartialEq, Eq)]
pub struct BusyHandle {
    id: RequestId,
}

impl BusyHandle {
    pub fn request_id(&self) -> RequestId {
        self.id
    }
}

/// Busy indicators keyed by request, so overlapping actions never clobber each other.
#[derive(Debug, Default)]
pub struct BusyBoard {
    active: BTreeMap<RequestId, String>,
}

impl BusyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, id: RequestId, message: impl Into<String>) -> BusyHandle {
        self.active.insert(id, message.into());
        BusyHandle { id }
    }

    pub fn dismiss(&mut self, handle: BusyHandle) -> bool {
        self.active.remove(&handle.id).is_some()
    }

    pub fn is_busy(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Message of the most recently shown indicator, or "" when idle.
    pub fn status_text(&self) -> &str {
        self.active
            .last_key_value()
            .map(|(_, message)| message.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ActionKind;
    use crate::runtime::request::{ActionRequest, CapturedRange};

    fn id() -> RequestId {
        ActionRequest::new(ActionKind::Chat, "x", CapturedRange::None).id()
    }

    #[test]
    fn test_overlapping_indicators_dismiss_independently() {
        let mut board = BusyBoard::new();
        let first = board.show(id(), "Processing text...");
        let second = board.show(id(), "Translating text...");
        assert_eq!(board.active_count(), 2);
        assert_eq!(board.status_text(), "Translating text...");

        assert!(board.dismiss(second));
        assert!(board.is_busy());
        assert_eq!(board.status_text(), "Processing text...");

        assert!(board.dismiss(first));
        assert!(!board.is_busy());
        assert_eq!(board.status_text(), "");
    }
}
