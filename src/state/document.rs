use std::ops::Range;

/// What the controller needs from the editing surface: read the text and selection,
/// and write results back.
pub trait DocumentSurface {
    fn text(&self) -> &str;

    /// Byte range of the current selection, if any.
    fn selection(&self) -> Option<Range<usize>>;

    /// Returns false, leaving the document untouched, when `range` is not a valid span.
    fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> bool;

    fn append(&mut self, text: &str);

    fn set_text(&mut self, text: &str);

    fn selected_text(&self) -> Option<&str> {
        let range = self.selection()?;
        self.text().get(range)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub buffer: String,
    pub cursor: usize,
}

#[derive(Default, Debug)]
pub struct DocumentState {
    pub buffer: String,
    pub cursor: usize,
    pub selection: Option<Range<usize>>,
    pub undo_stack: Vec<DocumentSnapshot>,
    pub redo_stack: Vec<DocumentSnapshot>,
}

/// In-memory document with byte-offset cursor and selection, plus undo/redo.
#[derive(Default, Debug)]
pub struct TextDocument {
    pub state: DocumentState,
}

impl TextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let buffer = text.into();
        let cursor = buffer.len();
        Self {
            state: DocumentState {
                buffer,
                cursor,
                ..DocumentState::default()
            },
        }
    }

    pub fn cursor(&self) -> usize {
        self.state.cursor
    }

    pub fn len(&self) -> usize {
        self.state.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.buffer.is_empty()
    }

    pub fn clamp_to_boundary_left(&self, mut idx: usize) -> usize {
        idx = idx.min(self.state.buffer.len());
        while idx > 0 && !self.state.buffer.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    }

    pub fn prev_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_to_boundary_left(idx);
        if i == 0 {
            return 0;
        }
        let mut j = i - 1;
        while j > 0 && !self.state.buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    pub fn next_char_boundary(&self, idx: usize) -> usize {
        let i = self.clamp_to_boundary_left(idx);
        if i >= self.state.buffer.len() {
            return self.state.buffer.len();
        }
        match self.state.buffer[i..].chars().next() {
            Some(ch) => i + ch.len_utf8(),
            None => self.state.buffer.len(),
        }
    }

    pub fn is_valid_range(&self, range: &Range<usize>) -> bool {
        range.start <= range.end
            && range.end <= self.state.buffer.len()
            && self.state.buffer.is_char_boundary(range.start)
            && self.state.buffer.is_char_boundary(range.end)
    }

    /// Selects `range`, snapping both ends to char boundaries. Empty ranges clear the selection.
    pub fn select(&mut self, range: Range<usize>) {
        let start = self.clamp_to_boundary_left(range.start);
        let end = self.clamp_to_boundary_left(range.end);
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if start == end {
            self.state.selection = None;
        } else {
            self.state.selection = Some(start..end);
            self.state.cursor = end;
        }
    }

    /// Selects the first occurrence of `needle`. Returns false when it is absent.
    pub fn select_text(&mut self, needle: &str) -> bool {
        match self.state.buffer.find(needle) {
            Some(start) if !needle.is_empty() => {
                self.select(start..start + needle.len());
                true
            }
            _ => false,
        }
    }

    pub fn select_all(&mut self) {
        self.select(0..self.state.buffer.len());
    }

    pub fn clear_selection(&mut self) {
        self.state.selection = None;
    }

    pub fn set_cursor(&mut self, idx: usize) {
        self.state.cursor = self.clamp_to_boundary_left(idx);
        self.state.selection = None;
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            buffer: self.state.buffer.clone(),
            cursor: self.state.cursor,
        }
    }

    pub fn push_undo(&mut self) {
        self.state.undo_stack.push(self.snapshot());
        self.state.redo_stack.clear();
    }

    pub fn restore(&mut self, snap: DocumentSnapshot) {
        self.state.buffer = snap.buffer;
        self.state.cursor = self.clamp_to_boundary_left(snap.cursor);
        self.state.selection = None;
    }

    /// Types `value` at the cursor, replacing the selection if there is one.
    pub fn insert_str(&mut self, value: &str) {
        self.push_undo();
        let at = match self.state.selection.take() {
            Some(range) => {
                self.state.buffer.replace_range(range.clone(), "");
                range.start
            }
            None => self.clamp_to_boundary_left(self.state.cursor),
        };
        self.state.buffer.insert_str(at, value);
        self.state.cursor = at + value.len();
    }

    pub fn backspace(&mut self) {
        if let Some(range) = self.state.selection.take() {
            self.push_undo();
            self.state.buffer.replace_range(range.clone(), "");
            self.state.cursor = range.start;
            return;
        }
        let end = self.clamp_to_boundary_left(self.state.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_char_boundary(end);
        self.push_undo();
        self.state.buffer.replace_range(start..end, "");
        self.state.cursor = start;
    }

    pub fn delete(&mut self) {
        let start = self.clamp_to_boundary_left(self.state.cursor);
        if start >= self.state.buffer.len() {
            return;
        }
        let end = self.next_char_boundary(start);
        self.push_undo();
        self.state.buffer.replace_range(start..end, "");
        self.state.cursor = start;
        self.state.selection = None;
    }

    pub fn undo(&mut self) -> bool {
        match self.state.undo_stack.pop() {
            Some(previous) => {
                self.state.redo_stack.push(self.snapshot());
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.state.redo_stack.pop() {
            Some(next) => {
                self.state.undo_stack.push(self.snapshot());
                self.restore(next);
                true
            }
            None => false,
        }
    }
}

impl DocumentSurface for TextDocument {
    fn text(&self) -> &str {
        &self.state.buffer
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.state
            .selection
            .clone()
            .filter(|range| self.is_valid_range(range) && range.start < range.end)
    }

    fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> bool {
        if !self.is_valid_range(&range) {
            return false;
        }
        self.push_undo();
        self.state.buffer.replace_range(range.clone(), replacement);
        self.state.cursor = range.start + replacement.len();
        self.state.selection = None;
        true
    }

    fn append(&mut self, text: &str) {
        self.push_undo();
        self.state.buffer.push_str(text);
        self.state.cursor = self.state.buffer.len();
    }

    fn set_text(&mut self, text: &str) {
        self.push_undo();
        self.state.buffer = text.to_string();
        self.state.cursor = self.state.buffer.len();
        self.state.selection = None;
    }
}
