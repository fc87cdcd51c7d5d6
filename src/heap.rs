//! Growth primitives the allocator builds its heap on.
//!
//! ```text
//!   base                                             top
//!    │                                                │
//!    ▼                                                ▼
//!    ┌────────────────────────────────────────────────┐
//!    │               region owned by the heap         │ grow(n) ──►
//!    └────────────────────────────────────────────────┘
//! ```
//!
//! A source only ever moves its top forward. Offsets handed out by
//! [`HeapSource::grow`] are relative to the base, so the allocator never
//! deals in raw addresses.

use std::{ptr, slice};

use libc::{c_void, intptr_t, sbrk};
use log::{debug, warn};

use crate::{
  align,
  config::DEFAULT_ARENA_LIMIT,
  error::{AllocError, Result},
};

/// A contiguous region that can be extended at its top.
pub trait HeapSource {
  /// Moves the top forward by `increment` bytes and returns the previous
  /// top. On failure the region is left exactly as it was.
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize>;

  /// Current size of the region in bytes.
  fn top(&self) -> usize;

  fn as_bytes(&self) -> &[u8];

  fn as_bytes_mut(&mut self) -> &mut [u8];
}

/// A heap backed by a growable buffer with a hard size limit.
///
/// Several arenas can live side by side in one process, which is what
/// the tests rely on. The buffer may move when it grows, so raw pointers
/// into it do not survive a growth call; offsets do.
#[derive(Debug, Clone)]
pub struct ArenaHeap {
  bytes: Vec<u8>,
  limit: usize,
}

impl ArenaHeap {
  pub fn new() -> Self {
    Self::with_limit(DEFAULT_ARENA_LIMIT)
  }

  pub fn with_limit(limit: usize) -> Self {
    Self {
      bytes: Vec::new(),
      limit,
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }
}

impl Default for ArenaHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapSource for ArenaHeap {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize> {
    let previous = self.bytes.len();
    let oom = AllocError::OutOfMemory {
      requested: increment,
    };

    let wanted = match previous.checked_add(increment) {
      Some(wanted) if wanted <= self.limit => wanted,
      _ => {
        warn!("arena limit {} reached, refusing {} bytes", self.limit, increment);
        return Err(oom);
      }
    };

    self.bytes.try_reserve(increment).map_err(|_| oom)?;
    self.bytes.resize(wanted, 0);

    Ok(previous)
  }

  fn top(&self) -> usize {
    self.bytes.len()
  }

  fn as_bytes(&self) -> &[u8] {
    &self.bytes
  }

  fn as_bytes_mut(&mut self) -> &mut [u8] {
    &mut self.bytes
  }
}

/// A heap carved out of the process data segment with `sbrk(2)`.
///
/// The first growth pads the break up to the block alignment. After
/// that, every growth must start exactly where the previous one ended;
/// if anything else in the process moved the break in between, the new
/// bytes are handed back and the call fails.
///
/// Memory is never returned to the operating system.
#[derive(Debug)]
pub struct BreakHeap {
  base: *mut u8,
  len: usize,
}

impl BreakHeap {
  pub fn new() -> Self {
    Self {
      base: ptr::null_mut(),
      len: 0,
    }
  }

  /// The current program break, as reported by `sbrk(0)`.
  pub fn program_break() -> *mut c_void {
    unsafe { sbrk(0) }
  }

  /// Address of the first byte owned by this heap, or null before the
  /// first growth.
  pub fn base(&self) -> *mut u8 {
    self.base
  }

  unsafe fn move_break(increment: isize) -> Option<*mut u8> {
    let previous = unsafe { sbrk(increment as intptr_t) };

    if previous == usize::MAX as *mut c_void {
      return None;
    }

    Some(previous as *mut u8)
  }

  /// Lowers the break by `increment` bytes. Returns false, and leaves the
  /// bytes stranded above the heap, when that fails.
  fn give_back(increment: usize) -> bool {
    let returned = isize::try_from(increment)
      .ok()
      .and_then(|bytes| unsafe { Self::move_break(-bytes) })
      .is_some();

    if !returned {
      warn!("could not return {} bytes to the program break", increment);
    }

    returned
  }
}

impl Default for BreakHeap {
  fn default() -> Self {
    Self::new()
  }
}

impl HeapSource for BreakHeap {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize> {
    let oom = AllocError::OutOfMemory {
      requested: increment,
    };

    if self.base.is_null() {
      let current = Self::program_break() as usize;
      let slack = align!(current) - current;
      let total = increment.checked_add(slack).ok_or(oom.clone())?;
      let signed = isize::try_from(total).map_err(|_| oom.clone())?;

      let previous = unsafe { Self::move_break(signed) }.ok_or_else(|| {
        warn!("sbrk refused {} bytes", total);
        oom.clone()
      })?;

      if previous as usize != current {
        Self::give_back(total);
        return Err(AllocError::Discontiguous {
          expected: current,
          actual: previous as usize,
        });
      }

      self.base = previous.wrapping_add(slack);
      self.len = increment;
      debug!("break heap based at {:?} with {} bytes", self.base, increment);

      return Ok(0);
    }

    let signed = isize::try_from(increment).map_err(|_| oom.clone())?;
    let expected = self.base as usize + self.len;

    let previous = unsafe { Self::move_break(signed) }.ok_or_else(|| {
      warn!("sbrk refused {} bytes", increment);
      oom
    })?;

    if previous as usize != expected {
      Self::give_back(increment);
      return Err(AllocError::Discontiguous {
        expected,
        actual: previous as usize,
      });
    }

    let old = self.len;
    self.len += increment;

    Ok(old)
  }

  fn top(&self) -> usize {
    self.len
  }

  fn as_bytes(&self) -> &[u8] {
    if self.base.is_null() {
      return &[];
    }

    // [base, base + len) was handed to us by sbrk and is never given back.
    unsafe { slice::from_raw_parts(self.base, self.len) }
  }

  fn as_bytes_mut(&mut self) -> &mut [u8] {
    if self.base.is_null() {
      return &mut [];
    }

    unsafe { slice::from_raw_parts_mut(self.base, self.len) }
  }
}
