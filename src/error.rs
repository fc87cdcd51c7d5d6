use thiserror::Error;

/// Failures surfaced by the allocator and its heap sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
  /// The growth primitive refused to move the top of the heap.
  #[error("out of memory: could not grow the heap by {requested} bytes")]
  OutOfMemory { requested: usize },

  /// Someone else moved the program break between two growth calls.
  #[error("heap is no longer contiguous: expected break at {expected:#x}, got {actual:#x}")]
  Discontiguous { expected: usize, actual: usize },

  /// A boundary-tag access fell outside the heap.
  #[error("tag access at offset {offset:#x} is outside the heap (top {top:#x})")]
  OutOfBounds { offset: usize, top: usize },

  /// The pointer does not name a live allocation.
  #[error("invalid free of offset {offset:#x}")]
  InvalidFree { offset: usize },

  /// The block chain failed a consistency check.
  #[error("heap inconsistent at offset {offset:#x}: {reason}")]
  Inconsistent { offset: usize, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, AllocError>;
