use crate::prompt::ActionKind;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Where the input came from, recorded at capture time and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedRange {
    /// A selection: byte offsets plus the text they held.
    Span { range: Range<usize>, text: String },
    WholeDocument,
    /// Typed input with no document origin.
    None,
}

/// One user action, frozen at dispatch time.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    id: RequestId,
    kind: ActionKind,
    input: String,
    target: CapturedRange,
}

impl ActionRequest {
    pub fn new(kind: ActionKind, input: impl Into<String>, target: CapturedRange) -> Self {
        Self {
            id: RequestId::next(),
            kind,
            input: input.into(),
            target,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn target(&self) -> &CapturedRange {
        &self.target
    }
}
