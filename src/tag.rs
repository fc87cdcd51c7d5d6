//! Boundary-tag encoding.
//!
//! Every block carries the same tag word at both ends:
//!
//! ```text
//!   31                                   3   2   1   0
//!  ┌───────────────────────────────────────┬───┬───┬───┐
//!  │          block size (multiple of 8)   │ - │ - │ A │
//!  └───────────────────────────────────────┴───┴───┴───┘
//!                                            reserved   allocated
//! ```

/// Width of a header or footer word.
pub const WSIZE: usize = 4;

/// Header plus footer.
pub const DSIZE: usize = 2 * WSIZE;

/// Every block size is a multiple of this.
pub const ALIGNMENT: usize = 8;

/// Smallest block the splitter is allowed to carve out.
pub const MIN_BLOCK: usize = 8;

const ALLOC_BIT: u32 = 0x1;
const SIZE_MASK: u32 = !0x7;

/// Largest block size a tag can encode.
pub const MAX_BLOCK: usize = SIZE_MASK as usize;

/// A decoded header/footer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
  pub size: usize,
  pub allocated: bool,
}

impl Tag {
  pub(crate) fn new(
    size: usize,
    allocated: bool,
  ) -> Self {
    debug_assert!(size % ALIGNMENT == 0 && size <= MAX_BLOCK);
    Self { size, allocated }
  }

  pub(crate) fn free(size: usize) -> Self {
    Self::new(size, false)
  }

  pub(crate) fn used(size: usize) -> Self {
    Self::new(size, true)
  }

  /// The zero-size allocated sentinel at the top of the heap.
  pub fn epilogue() -> Self {
    Self::used(0)
  }

  pub fn is_epilogue(&self) -> bool {
    self.size == 0
  }

  /// Encodes the tag. Size bits below the alignment never reach the
  /// reserved bits.
  pub fn pack(&self) -> u32 {
    (self.size as u32 & SIZE_MASK) | if self.allocated { ALLOC_BIT } else { 0 }
  }

  pub fn unpack(word: u32) -> Self {
    Self {
      size: (word & SIZE_MASK) as usize,
      allocated: word & ALLOC_BIT != 0,
    }
  }
}
