use tagalloc::{
  AllocError, Allocator, ArenaHeap, DEFAULT_CHUNK_SIZE, HeapSource, Result,
  tag::{DSIZE, Tag, WSIZE},
};

/// Records every growth request on top of an arena.
#[derive(Default)]
struct RecordingHeap {
  inner: ArenaHeap,
  grows: Vec<usize>,
}

impl HeapSource for RecordingHeap {
  fn grow(
    &mut self,
    increment: usize,
  ) -> Result<usize> {
    self.grows.push(increment);
    self.inner.grow(increment)
  }

  fn top(&self) -> usize {
    self.inner.top()
  }

  fn as_bytes(&self) -> &[u8] {
    self.inner.as_bytes()
  }

  fn as_bytes_mut(&mut self) -> &mut [u8] {
    self.inner.as_bytes_mut()
  }
}

fn tag_at(
  allocator: &Allocator<impl HeapSource>,
  at: usize,
) -> Tag {
  let bytes = &allocator.heap().as_bytes()[at..at + WSIZE];
  Tag::unpack(u32::from_ne_bytes(bytes.try_into().unwrap()))
}

#[test]
fn first_fit_reuses_freed_block() {
  let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();

  let p1 = allocator.malloc(100).unwrap().unwrap();
  let _p2 = allocator.malloc(200).unwrap().unwrap();
  allocator.free(p1).unwrap();
  let p3 = allocator.malloc(50).unwrap().unwrap();

  assert_eq!(p3, p1);
  allocator.check().unwrap();
}

#[test]
fn oversized_request_grows_once() {
  let mut allocator = Allocator::init(RecordingHeap::default()).unwrap();
  assert_eq!(allocator.heap().grows, vec![4 * WSIZE]);

  let p = allocator.malloc(DEFAULT_CHUNK_SIZE * 2).unwrap().unwrap();

  let grows = &allocator.heap().grows[1..];
  assert_eq!(grows.len(), 1);
  assert_eq!(grows[0] % 8, 0);
  assert!(grows[0] >= DEFAULT_CHUNK_SIZE * 2 + DSIZE);

  let size = tag_at(&allocator, p - WSIZE).size;
  assert_eq!(p + size, allocator.top());
  assert_eq!(tag_at(&allocator, allocator.top() - WSIZE), Tag::epilogue());
}

#[test]
fn small_requests_share_a_chunk() {
  let mut allocator = Allocator::init(RecordingHeap::default()).unwrap();

  for _ in 0..16 {
    allocator.malloc(64).unwrap().unwrap();
  }

  assert_eq!(allocator.heap().grows, vec![4 * WSIZE, DEFAULT_CHUNK_SIZE]);
}

#[test]
fn shrink_never_relocates() {
  let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();

  let p = allocator.malloc(200).unwrap().unwrap();
  let q = allocator.realloc(Some(p), 50).unwrap();

  assert_eq!(q, Some(p));
  allocator.check().unwrap();
}

#[test]
fn grow_in_place_into_free_successor() {
  let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();

  let p = allocator.malloc(100).unwrap().unwrap();
  let successor = allocator
    .blocks()
    .map(|block| block.unwrap())
    .find(|block| block.offset > p)
    .unwrap();
  assert!(!successor.allocated);

  let q = allocator
    .realloc(Some(p), 100 + successor.size - DSIZE)
    .unwrap();

  assert_eq!(q, Some(p));
  allocator.check().unwrap();
}

#[test]
fn grow_relocates_when_successor_is_taken() {
  let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();

  let p = allocator.malloc(100).unwrap().unwrap();
  let _neighbor = allocator.malloc(100).unwrap().unwrap();

  let original: Vec<u8> = (0..100u8).collect();
  allocator.payload_mut(p).unwrap()[..100].copy_from_slice(&original);

  let q = allocator.realloc(Some(p), 300).unwrap().unwrap();

  assert_ne!(q, p);
  assert_eq!(&allocator.payload(q).unwrap()[..100], &original[..]);
  allocator.check().unwrap();
}

#[test]
fn failed_growth_is_reported_and_harmless() {
  let mut allocator = Allocator::init(ArenaHeap::with_limit(1024)).unwrap();

  let before = allocator.heap().as_bytes().to_vec();

  assert!(matches!(
    allocator.malloc(10),
    Err(AllocError::OutOfMemory { .. })
  ));
  assert_eq!(allocator.heap().as_bytes(), &before[..]);
  assert_eq!(allocator.realloc(None, 0).unwrap(), None);
}

#[test]
fn independent_heaps() {
  let mut first = Allocator::init(ArenaHeap::new()).unwrap();
  let mut second = Allocator::init(ArenaHeap::new()).unwrap();

  let a = first.malloc(32).unwrap().unwrap();
  let b = second.malloc(32).unwrap().unwrap();

  first.payload_mut(a).unwrap().fill(1);
  second.payload_mut(b).unwrap().fill(2);

  assert!(first.payload(a).unwrap().iter().all(|&byte| byte == 1));
  assert!(second.payload(b).unwrap().iter().all(|&byte| byte == 2));
}
