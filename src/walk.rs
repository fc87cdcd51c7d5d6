//! Walking and checking the block chain.

use crate::{
  allocator::Allocator,
  error::{AllocError, Result},
  heap::HeapSource,
  tag::{ALIGNMENT, DSIZE, MIN_BLOCK, Tag},
};

/// One block between the prologue and the epilogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Payload offset, as returned by `malloc`.
  pub offset: usize,
  /// Total size including header and footer.
  pub size: usize,
  pub allocated: bool,
}

impl BlockInfo {
  pub fn usable_size(&self) -> usize {
    self.size - DSIZE
  }
}

/// Summary produced by [`Allocator::check`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub heap_size: usize,
  pub allocated_blocks: usize,
  pub free_blocks: usize,
  pub allocated_bytes: usize,
  pub free_bytes: usize,
  pub largest_free: usize,
}

/// Iterator over the block chain, see [`Allocator::blocks`].
pub struct Blocks<'a, H: HeapSource> {
  allocator: &'a Allocator<H>,
  cursor: Option<usize>,
}

impl<'a, H: HeapSource> Iterator for Blocks<'a, H> {
  type Item = Result<BlockInfo>;

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor?;

    let tag = match self.allocator.header(offset) {
      Ok(tag) => tag,
      Err(err) => {
        self.cursor = None;
        return Some(Err(err));
      }
    };

    if tag.is_epilogue() {
      self.cursor = None;
      return None;
    }

    self.cursor = Some(offset + tag.size);

    Some(Ok(BlockInfo {
      offset,
      size: tag.size,
      allocated: tag.allocated,
    }))
  }
}

impl<H: HeapSource> Allocator<H> {
  /// Every block after the prologue, in address order.
  pub fn blocks(&self) -> Blocks<'_, H> {
    Blocks {
      allocator: self,
      cursor: Some(self.head() + DSIZE),
    }
  }

  /// Walks the whole chain and verifies its invariants.
  pub fn check(&self) -> Result<HeapStats> {
    let head = self.head();
    let prologue = Tag::used(DSIZE);

    if self.header(head)? != prologue || self.read_tag(head)? != prologue {
      return Err(inconsistent(head, "bad prologue"));
    }

    let mut stats = HeapStats {
      heap_size: self.top(),
      ..HeapStats::default()
    };
    let mut previous_free = false;
    let mut end = head + DSIZE;

    for block in self.blocks() {
      let block = block?;

      if block.size % ALIGNMENT != 0 || block.size < MIN_BLOCK {
        return Err(inconsistent(block.offset, "misaligned block size"));
      }

      let footer = self.read_tag(block.offset + block.size - DSIZE)?;
      if footer.size != block.size || footer.allocated != block.allocated {
        return Err(inconsistent(block.offset, "header and footer disagree"));
      }

      if block.allocated {
        stats.allocated_blocks += 1;
        stats.allocated_bytes += block.size;
      } else {
        if previous_free {
          return Err(inconsistent(block.offset, "adjacent free blocks"));
        }
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      }

      previous_free = !block.allocated;
      end = block.offset + block.size;
    }

    if end != self.top() {
      return Err(inconsistent(end, "epilogue is not at the top of the heap"));
    }

    Ok(stats)
  }
}

fn inconsistent(
  offset: usize,
  reason: &'static str,
) -> AllocError {
  AllocError::Inconsistent { offset, reason }
}
