//! Decides where a successful reply lands.
//!
//! Substitution targets are offsets captured when the action fired. The document may
//! have changed since, so a span is only reused if it still holds exactly the captured
//! text; anything else falls back to appending the reply after the current content.

use super::request::CapturedRange;
use crate::prompt::Destination;
use crate::state::{ConversationLog, DocumentSurface, Role};
use std::ops::Range;

pub const APPEND_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Substituted { range: Range<usize> },
    Appended,
    ReplacedDocument,
    Conversation,
}

pub fn route_reply<D: DocumentSurface>(
    destination: Destination,
    target: &CapturedRange,
    reply: &str,
    document: &mut D,
    conversation: &mut ConversationLog,
) -> Applied {
    match destination {
        Destination::Conversation => {
            conversation.push(Role::Assistant, reply);
            Applied::Conversation
        }
        Destination::ReplaceDocument => {
            document.set_text(reply);
            Applied::ReplacedDocument
        }
        Destination::Substitute => substitute(document, target, reply),
    }
}

pub fn substitute<D: DocumentSurface>(
    document: &mut D,
    target: &CapturedRange,
    reply: &str,
) -> Applied {
    if let CapturedRange::Span { range, text } = target {
        let still_there = document.text().get(range.clone()) == Some(text.as_str());
        if still_there && document.replace_range(range.clone(), reply) {
            return Applied::Substituted {
                range: range.start..range.start + reply.len(),
            };
        }
        tracing::debug!(?range, "captured range no longer matches; appending reply");
    }

    document.append(&format!("{APPEND_SEPARATOR}{reply}"));
    Applied::Appended
}
