//! # tagalloc - An Implicit Free List Allocator
//!
//! This crate provides a `malloc`/`free`/`realloc` allocator over a single
//! growable heap. Blocks are tracked with **boundary tags**: every block
//! carries its size and allocation bit in both a header and a footer, so
//! either neighbor can be found in constant time.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌─────┬──────────┬──────────────┬──────────┬──────────────┬──────────┐
//!   │ pad │ prologue │   block A    │ block B  │   block C    │ epilogue │
//!   │     │   8/1    │  112/alloc   │  64/free │  208/alloc   │   0/1    │
//!   └─────┴──────────┴──────────────┴──────────┴──────────────┴──────────┘
//!                    ▲                                                   ▲
//!                    └── first block                               top of heap
//!
//!   Single Block:
//!
//!   ┌────────┬─────────────────────────────────────────┬────────┐
//!   │ header │               payload                   │ footer │
//!   │ size|a │                                         │ size|a │
//!   └────────┴─────────────────────────────────────────┴────────┘
//!    4 bytes ▲                                           4 bytes
//!            └── offset returned to the caller
//! ```
//!
//! Free blocks are never linked explicitly. `malloc` walks the chain from
//! the prologue and takes the first free block that is large enough,
//! splitting off the tail when the leftover can stand as a block of its
//! own. If nothing fits, the heap grows by at least one chunk. `free`
//! merges the block with any free neighbor immediately, so two free
//! blocks are never adjacent between calls.
//!
//! ## Crate Structure
//!
//! ```text
//!   tagalloc
//!   ├── align      - Alignment macro (align!)
//!   ├── tag        - Boundary-tag encoding and layout constants
//!   ├── heap       - Growth primitives (ArenaHeap, BreakHeap)
//!   ├── config     - HeapConfig
//!   ├── error      - AllocError
//!   ├── allocator  - Allocator: malloc, free, realloc
//!   └── walk       - Block iteration and heap consistency checks
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use tagalloc::{Allocator, ArenaHeap};
//!
//! let mut allocator = Allocator::init(ArenaHeap::new())?;
//!
//! let p = allocator.malloc(100)?.expect("non-zero request");
//! allocator.payload_mut(p)?[..5].copy_from_slice(b"hello");
//!
//! let p = allocator.realloc(Some(p), 400)?.expect("non-zero request");
//! assert_eq!(&allocator.payload(p)?[..5], b"hello");
//!
//! allocator.free(p)?;
//! allocator.check()?;
//! # Ok::<(), tagalloc::AllocError>(())
//! ```
//!
//! ## Limitations
//!
//! - **Single caller per heap**: every mutating call takes `&mut self`;
//!   share a heap behind your own lock.
//! - **Never shrinks**: memory is not returned to the operating system.
//! - **Linear search**: allocation is O(number of blocks).
//! - **32-bit tags**: a heap never exceeds 4 GiB.

pub mod align;
mod allocator;
mod config;
mod error;
mod heap;
pub mod tag;
mod walk;

pub use allocator::Allocator;
pub use config::{DEFAULT_ARENA_LIMIT, DEFAULT_CHUNK_SIZE, HeapConfig};
pub use error::{AllocError, Result};
pub use heap::{ArenaHeap, BreakHeap, HeapSource};
pub use walk::{BlockInfo, Blocks, HeapStats};
