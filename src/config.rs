//! Tunables for a heap instance.

use crate::{
  align,
  tag::{MAX_BLOCK, MIN_BLOCK},
};

/// Minimum growth request when no free block fits (4 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 12;

/// Default ceiling for an [`ArenaHeap`](crate::ArenaHeap) (64 MiB).
pub const DEFAULT_ARENA_LIMIT: usize = 64 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
  /// Bytes requested from the growth primitive on a miss, unless the
  /// request itself is larger.
  ///
  /// Default: 4,096. Always a multiple of 8, at least one minimum block and
  /// at most the largest size a tag can encode.
  pub chunk_size: usize,
}

impl HeapConfig {
  pub fn with_chunk_size(
    mut self,
    chunk_size: usize,
  ) -> Self {
    // MAX_BLOCK is itself aligned, so rounding up cannot leave the range.
    self.chunk_size = align!(chunk_size.clamp(MIN_BLOCK, MAX_BLOCK));
    self
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self {
      chunk_size: DEFAULT_CHUNK_SIZE,
    }
  }
}
