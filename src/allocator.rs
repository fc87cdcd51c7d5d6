use log::{debug, trace, warn};

use crate::{
  align::checked_align,
  config::HeapConfig,
  error::{AllocError, Result},
  heap::HeapSource,
  tag::{ALIGNMENT, DSIZE, MAX_BLOCK, MIN_BLOCK, Tag, WSIZE},
};

/// Implicit free list allocator with boundary tags.
///
/// Every block address handed out or accepted by this type is a payload
/// offset from the base of the underlying [`HeapSource`].
///
/// ```text
///   base
///    ▼
///    ┌─────┬─────┬─────┬────────┬─────────────┬────────┬─────┬─────┐
///    │ pad │ 8/1 │ 8/1 │ hdr    │   payload   │ ftr    │ ... │ 0/1 │
///    └─────┴─────┴─────┴────────┴─────────────┴────────┴─────┴─────┘
///           prologue    ▲                                     epilogue
///                 ▲     └── block offset
///                 └── traversal start
/// ```
pub struct Allocator<H: HeapSource> {
  heap: H,
  config: HeapConfig,
  head: usize,
}

impl<H: HeapSource> Allocator<H> {
  /// Lays down the prologue and epilogue on `heap` with the default
  /// configuration.
  pub fn init(heap: H) -> Result<Self> {
    Self::with_config(heap, HeapConfig::default())
  }

  /// Lays down the prologue and epilogue on `heap`.
  ///
  /// Fails without writing anything if the heap cannot grow.
  pub fn with_config(
    mut heap: H,
    config: HeapConfig,
  ) -> Result<Self> {
    let top = heap.top();
    let slack = checked_align(top).ok_or(AllocError::OutOfMemory { requested: top })? - top;
    let base = heap.grow(slack + 4 * WSIZE)? + slack;

    let mut allocator = Self {
      heap,
      config,
      head: base + DSIZE,
    };

    allocator.write_word(base, 0)?;
    allocator.write_tag(base + WSIZE, Tag::used(DSIZE))?;
    allocator.write_tag(base + DSIZE, Tag::used(DSIZE))?;
    allocator.write_tag(base + 3 * WSIZE, Tag::epilogue())?;

    debug!("heap initialized at offset {:#x}", base);

    Ok(allocator)
  }

  pub fn config(&self) -> &HeapConfig {
    &self.config
  }

  pub fn heap(&self) -> &H {
    &self.heap
  }

  /// Current top of the heap, one past the epilogue header.
  pub fn top(&self) -> usize {
    self.heap.top()
  }

  /// Payload offset of the prologue, where every traversal starts.
  pub fn head(&self) -> usize {
    self.head
  }

  /// Allocates at least `size` bytes.
  ///
  /// Returns `Ok(None)` for a zero-size request. On `OutOfMemory` the
  /// block chain is exactly as it was before the call.
  pub fn malloc(
    &mut self,
    size: usize,
  ) -> Result<Option<usize>> {
    if size == 0 {
      return Ok(None);
    }

    let asize = Self::adjusted_size(size)?;

    self.allocate_block(asize).map(Some)
  }

  /// Releases the block at `offset` and merges it with free neighbors.
  ///
  /// Offsets that do not name a live allocation are rejected with
  /// `InvalidFree` where that is cheap to detect; the check is best
  /// effort and does not replace the caller's obligation.
  pub fn free(
    &mut self,
    offset: usize,
  ) -> Result<()> {
    let tag = self.live_block(offset)?;

    self.set_block(offset, Tag::free(tag.size))?;
    self.coalesce(offset)?;

    Ok(())
  }

  /// Resizes the allocation at `offset`, moving it only when it cannot
  /// grow in place.
  ///
  /// `None` behaves as [`malloc`](Self::malloc); a zero `size` behaves as
  /// [`free`](Self::free) and returns `Ok(None)`. If a move is needed
  /// and the heap cannot grow, the original block is left untouched.
  pub fn realloc(
    &mut self,
    offset: Option<usize>,
    size: usize,
  ) -> Result<Option<usize>> {
    let Some(offset) = offset else {
      return self.malloc(size);
    };

    if size == 0 {
      self.free(offset)?;
      return Ok(None);
    }

    let old = self.live_block(offset)?;
    let asize = Self::adjusted_size(size)?;

    if asize == old.size {
      return Ok(Some(offset));
    }

    if asize < old.size {
      self.place(offset, asize)?;
      return Ok(Some(offset));
    }

    let next = self.header(offset + old.size)?;

    if !next.allocated && old.size + next.size >= asize {
      trace!(
        "realloc {:#x}: absorbing {} free bytes in place",
        offset, next.size
      );
      self.set_block(offset, Tag::used(old.size + next.size))?;
      return Ok(Some(offset));
    }

    let moved = self.allocate_block(asize)?;
    let count = (old.size - DSIZE).min(size);

    trace!("realloc {:#x}: moving {} bytes to {:#x}", offset, count, moved);

    self
      .heap
      .as_bytes_mut()
      .copy_within(offset..offset + count, moved);
    self.free(offset)?;

    Ok(Some(moved))
  }

  /// Bytes the caller may use at `offset`.
  pub fn usable_size(
    &self,
    offset: usize,
  ) -> Result<usize> {
    Ok(self.live_block(offset)?.size - DSIZE)
  }

  pub fn payload(
    &self,
    offset: usize,
  ) -> Result<&[u8]> {
    let len = self.usable_size(offset)?;
    let top = self.top();

    self
      .heap
      .as_bytes()
      .get(offset..offset + len)
      .ok_or(AllocError::OutOfBounds { offset, top })
  }

  pub fn payload_mut(
    &mut self,
    offset: usize,
  ) -> Result<&mut [u8]> {
    let len = self.usable_size(offset)?;
    let top = self.top();

    self
      .heap
      .as_bytes_mut()
      .get_mut(offset..offset + len)
      .ok_or(AllocError::OutOfBounds { offset, top })
  }

  /// Raw address of the payload at `offset`.
  ///
  /// Stable for the lifetime of the heap with a
  /// [`BreakHeap`](crate::BreakHeap); an [`ArenaHeap`](crate::ArenaHeap)
  /// may move its buffer on the next growth.
  pub fn as_ptr(
    &mut self,
    offset: usize,
  ) -> *mut u8 {
    self.heap.as_bytes_mut().as_mut_ptr().wrapping_add(offset)
  }

  /// Padded block size for a request: payload plus header and footer,
  /// rounded up to the alignment.
  fn adjusted_size(size: usize) -> Result<usize> {
    size
      .checked_add(DSIZE)
      .and_then(checked_align)
      .filter(|asize| *asize <= MAX_BLOCK)
      .ok_or(AllocError::OutOfMemory { requested: size })
  }

  /// First fit, then growth. Shared by `malloc` and the moving path of
  /// `realloc`.
  fn allocate_block(
    &mut self,
    asize: usize,
  ) -> Result<usize> {
    let offset = match self.find_fit(asize)? {
      Some(offset) => offset,
      None => {
        // Near the tag limit a full chunk no longer fits; ask for just enough.
        let chunk = asize.max(self.config.chunk_size);
        let grow_by = match self.top().checked_add(chunk) {
          Some(top) if top <= MAX_BLOCK => chunk,
          _ => asize,
        };

        self.extend_heap(grow_by)?
      }
    };

    self.place(offset, asize)?;

    Ok(offset)
  }

  /// Grows the heap by `bytes` (aligned up) and returns the resulting
  /// free block, already merged with a free tail block if there was one.
  pub(crate) fn extend_heap(
    &mut self,
    bytes: usize,
  ) -> Result<usize> {
    let oom = AllocError::OutOfMemory { requested: bytes };
    let size = checked_align(bytes).ok_or(oom.clone())?;

    // Tags encode 32-bit sizes, so no block may ever outgrow that.
    match self.top().checked_add(size) {
      Some(top) if top <= MAX_BLOCK => {}
      _ => return Err(oom),
    }

    // The old epilogue header becomes the new block's header.
    let offset = self.heap.grow(size)?;

    debug!("heap grew by {} bytes, top now {:#x}", size, self.top());

    self.set_block(offset, Tag::free(size))?;
    self.write_tag(offset + size - WSIZE, Tag::epilogue())?;

    self.coalesce(offset)
  }

  /// First free block of at least `asize` bytes, scanning from the
  /// prologue to the epilogue.
  pub(crate) fn find_fit(
    &self,
    asize: usize,
  ) -> Result<Option<usize>> {
    let mut offset = self.head;

    loop {
      let tag = self.header(offset)?;

      if tag.is_epilogue() {
        return Ok(None);
      }

      if !tag.allocated && tag.size >= asize {
        trace!("fit for {} bytes at {:#x} ({} bytes)", asize, offset, tag.size);
        return Ok(Some(offset));
      }

      offset += tag.size;
    }
  }

  /// Marks the block at `offset` allocated with `asize` bytes, splitting
  /// off the rest as a free block when it is big enough to stand alone.
  pub(crate) fn place(
    &mut self,
    offset: usize,
    asize: usize,
  ) -> Result<()> {
    let size = self.header(offset)?.size;
    debug_assert!(size >= asize);

    if size - asize >= MIN_BLOCK {
      trace!("split {:#x}: {} -> {} + {}", offset, size, asize, size - asize);

      self.set_block(offset, Tag::used(asize))?;

      let rest = offset + asize;
      self.set_block(rest, Tag::free(size - asize))?;

      // A shrinking realloc may leave the remainder next to a free block.
      self.coalesce(rest)?;
    } else {
      self.set_block(offset, Tag::used(size))?;
    }

    Ok(())
  }

  /// Merges the free block at `offset` with whichever neighbors are free
  /// and returns the offset of the merged block.
  pub(crate) fn coalesce(
    &mut self,
    offset: usize,
  ) -> Result<usize> {
    let size = self.header(offset)?.size;
    let prev = self.read_tag(offset.wrapping_sub(DSIZE))?;
    let next = self.header(offset + size)?;

    match (prev.allocated, next.allocated) {
      (true, true) => Ok(offset),
      (false, true) => {
        let merged = offset.wrapping_sub(prev.size);
        trace!("coalesce {:#x} into predecessor {:#x}", offset, merged);
        self.set_block(merged, Tag::free(prev.size + size))?;
        Ok(merged)
      }
      (true, false) => {
        trace!("coalesce {:#x} with successor", offset);
        self.set_block(offset, Tag::free(size + next.size))?;
        Ok(offset)
      }
      (false, false) => {
        let merged = offset.wrapping_sub(prev.size);
        trace!("coalesce {:#x} with both neighbors into {:#x}", offset, merged);
        self.set_block(merged, Tag::free(prev.size + size + next.size))?;
        Ok(merged)
      }
    }
  }

  /// Header of a block that the caller claims is allocated.
  fn live_block(
    &self,
    offset: usize,
  ) -> Result<Tag> {
    let invalid = || {
      warn!("rejecting invalid block {:#x}", offset);
      AllocError::InvalidFree { offset }
    };

    if offset <= self.head || offset >= self.top() || offset % ALIGNMENT != 0 {
      return Err(invalid());
    }

    let header = self.header(offset).map_err(|_| invalid())?;

    if !header.allocated || header.size < MIN_BLOCK {
      return Err(invalid());
    }

    let footer = self
      .read_tag(offset + header.size - DSIZE)
      .map_err(|_| invalid())?;

    if footer != header {
      return Err(invalid());
    }

    Ok(header)
  }

  pub(crate) fn header(
    &self,
    offset: usize,
  ) -> Result<Tag> {
    self.read_tag(offset.wrapping_sub(WSIZE))
  }

  /// Writes matching header and footer for the block at `offset`.
  fn set_block(
    &mut self,
    offset: usize,
    tag: Tag,
  ) -> Result<()> {
    self.write_tag(offset.wrapping_sub(WSIZE), tag)?;
    self.write_tag(offset + tag.size - DSIZE, tag)
  }

  pub(crate) fn read_tag(
    &self,
    at: usize,
  ) -> Result<Tag> {
    self.read_word(at).map(Tag::unpack)
  }

  pub(crate) fn write_tag(
    &mut self,
    at: usize,
    tag: Tag,
  ) -> Result<()> {
    self.write_word(at, tag.pack())
  }

  fn read_word(
    &self,
    at: usize,
  ) -> Result<u32> {
    let top = self.top();

    at.checked_add(WSIZE)
      .and_then(|end| self.heap.as_bytes().get(at..end))
      .and_then(|word| <[u8; WSIZE]>::try_from(word).ok())
      .map(u32::from_ne_bytes)
      .ok_or(AllocError::OutOfBounds { offset: at, top })
  }

  fn write_word(
    &mut self,
    at: usize,
    value: u32,
  ) -> Result<()> {
    let top = self.top();

    let word = at
      .checked_add(WSIZE)
      .and_then(|end| self.heap.as_bytes_mut().get_mut(at..end))
      .ok_or(AllocError::OutOfBounds { offset: at, top })?;

    word.copy_from_slice(&value.to_ne_bytes());

    Ok(())
  }
}
