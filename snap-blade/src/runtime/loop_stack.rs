//! Nested iteration state for `@loop`, `@simplemenu` and friends
//!
//! Frames live on a single stack shared by a root render and every child
//! render it triggers. A frame's parent is the frame directly beneath it, so
//! a loop opened inside a partial still sees the loop that included it.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Which directive pair owns a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// `@loop` / `@endloop`; manages the current-item binding
    Loop,
    /// `@simplemenu` / `@endsimplemenu`
    SimpleMenu,
}

impl LoopKind {
    /// Name used in emitted code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loop => "loop",
            Self::SimpleMenu => "simplemenu",
        }
    }

    /// Parse the name used in emitted code
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "loop" => Some(Self::Loop),
            "simplemenu" => Some(Self::SimpleMenu),
            _ => None,
        }
    }

    /// Whether frames of this kind save and restore the current item
    #[must_use]
    pub const fn binds_current_item(self) -> bool {
        matches!(self, Self::Loop)
    }
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract violations on the loop stack
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopStackError {
    /// Pop or advance with no open frame
    #[error("no open loop frame (expected one opened by @{0})")]
    Empty(LoopKind),

    /// The top frame was opened by a different directive
    #[error("@end{expected} closed a frame opened by @{found}")]
    KindMismatch {
        /// Kind the closing directive expected
        expected: LoopKind,
        /// Kind of the frame actually on top
        found: LoopKind,
    },

    /// More advances than items
    #[error("advanced past the last of {count} items in @{kind} frame")]
    Exhausted {
        /// Kind of the exhausted frame
        kind: LoopKind,
        /// Number of items in the frame
        count: usize,
    },

    /// A render returned with frames it did not close, or closed frames it did not open
    #[error("render left the loop stack at depth {found}, expected {expected}")]
    Unbalanced {
        /// Depth recorded when the render started
        expected: usize,
        /// Depth when it finished
        found: usize,
    },
}

/// One level of active iteration
#[derive(Debug, Clone)]
pub struct LoopFrame {
    id: u64,
    kind: LoopKind,
    items: Vec<Value>,
    index: usize,
    started: bool,
    restore_item: Value,
}

impl LoopFrame {
    /// Directive pair that owns this frame
    #[must_use]
    pub const fn kind(&self) -> LoopKind {
        self.kind
    }

    /// Items being iterated
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Current 0-based position
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Current-item binding to reinstate when the frame is popped
    #[must_use]
    pub const fn restore_item(&self) -> &Value {
        &self.restore_item
    }

    /// Item at the current position, if the loop has started
    #[must_use]
    pub fn current(&self) -> Option<&Value> {
        if self.started {
            self.items.get(self.index)
        } else {
            None
        }
    }
}

/// Loop metadata exposed to templates as `blade_loop`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopMetadata {
    /// 0-based position
    pub index: usize,
    /// 1-based position
    pub iteration: usize,
    /// Items left after the current one
    pub remaining: usize,
    /// Total number of items
    pub count: usize,
    /// Whether this is the first item
    pub first: bool,
    /// Whether this is the last item
    pub last: bool,
    /// Whether `iteration` is even
    pub even: bool,
    /// Whether `iteration` is odd
    pub odd: bool,
    /// Nesting level, outermost loop is 1
    pub depth: usize,
    /// Metadata of the enclosing loop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<LoopMetadata>>,
}

impl LoopMetadata {
    /// Convert to a template value
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Identity of the stack at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    depth: usize,
    top: Option<u64>,
}

/// Stack of active loop frames
#[derive(Debug, Default)]
pub struct LoopStack {
    frames: Vec<LoopFrame>,
    next_id: u64,
}

impl LoopStack {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open frames
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether no loop is open
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost frame
    #[must_use]
    pub fn top(&self) -> Option<&LoopFrame> {
        self.frames.last()
    }

    /// Frame enclosing the innermost one
    #[must_use]
    pub fn parent(&self) -> Option<&LoopFrame> {
        self.frames.len().checked_sub(2).and_then(|i| self.frames.get(i))
    }

    /// Open a new frame on top of the current one
    ///
    /// `restore_item` is handed back by [`LoopStack::pop`] so the caller can
    /// reinstate whatever binding the loop overwrote.
    pub fn push(&mut self, kind: LoopKind, items: Vec<Value>, restore_item: Value) -> &LoopFrame {
        self.next_id += 1;
        self.frames.push(LoopFrame {
            id: self.next_id,
            kind,
            items,
            index: 0,
            started: false,
            restore_item,
        });
        tracing::trace!(%kind, depth = self.frames.len(), "loop frame pushed");
        &self.frames[self.frames.len() - 1]
    }

    /// Move the innermost frame to its next item and return the fresh metadata
    ///
    /// The first call lands on index 0.
    pub fn advance(&mut self, kind: LoopKind) -> Result<LoopMetadata, LoopStackError> {
        let frame = self.frames.last_mut().ok_or(LoopStackError::Empty(kind))?;
        if frame.kind != kind {
            return Err(LoopStackError::KindMismatch {
                expected: kind,
                found: frame.kind,
            });
        }

        let next = if frame.started { frame.index + 1 } else { 0 };
        if next >= frame.items.len() {
            return Err(LoopStackError::Exhausted {
                kind,
                count: frame.items.len(),
            });
        }
        frame.index = next;
        frame.started = true;

        self.top_metadata().ok_or(LoopStackError::Empty(kind))
    }

    /// Close the innermost frame, which must have been opened by `kind`
    pub fn pop(&mut self, kind: LoopKind) -> Result<LoopFrame, LoopStackError> {
        let found = self.frames.last().ok_or(LoopStackError::Empty(kind))?.kind;
        if found != kind {
            return Err(LoopStackError::KindMismatch {
                expected: kind,
                found,
            });
        }
        let frame = self.frames.pop().ok_or(LoopStackError::Empty(kind))?;
        tracing::trace!(%kind, depth = self.frames.len(), "loop frame popped");
        Ok(frame)
    }

    /// Metadata of the innermost frame, chained to its ancestors
    #[must_use]
    pub fn top_metadata(&self) -> Option<LoopMetadata> {
        self.metadata_at(self.frames.len().checked_sub(1)?)
    }

    fn metadata_at(&self, position: usize) -> Option<LoopMetadata> {
        let frame = self.frames.get(position)?;
        let count = frame.items.len();
        let iteration = if frame.started { frame.index + 1 } else { 0 };
        let parent = position
            .checked_sub(1)
            .and_then(|p| self.metadata_at(p))
            .map(Box::new);

        Some(LoopMetadata {
            index: frame.index,
            iteration,
            remaining: count.saturating_sub(frame.index + 1),
            count,
            first: frame.index == 0,
            last: frame.index + 1 >= count,
            even: iteration % 2 == 0,
            odd: iteration % 2 == 1,
            depth: position + 1,
            parent,
        })
    }

    /// Record the current stack identity
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            depth: self.frames.len(),
            top: self.frames.last().map(|f| f.id),
        }
    }

    /// Verify the stack is back where `checkpoint` left it
    pub fn verify(&self, checkpoint: Checkpoint) -> Result<(), LoopStackError> {
        if self.checkpoint() == checkpoint {
            Ok(())
        } else {
            Err(LoopStackError::Unbalanced {
                expected: checkpoint.depth,
                found: self.frames.len(),
            })
        }
    }

    /// Drop every frame above `checkpoint`
    ///
    /// Used when a render aborts so a reused stack starts clean.
    pub fn unwind(&mut self, checkpoint: Checkpoint) {
        self.frames.truncate(checkpoint.depth);
    }
}
