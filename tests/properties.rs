use proptest::prelude::*;
use tagalloc::{Allocator, ArenaHeap, BlockInfo, HeapSource};

#[derive(Debug, Clone)]
enum Op {
  Malloc(usize),
  Free(usize),
  Realloc(usize, usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (0usize..2048).prop_map(Op::Malloc),
    2 => any::<usize>().prop_map(Op::Free),
    2 => (any::<usize>(), 0usize..4096).prop_map(|(i, s)| Op::Realloc(i, s)),
  ]
}

fn pattern(
  seed: usize,
  len: usize,
) -> Vec<u8> {
  (0..len).map(|i| (i * 31 + seed) as u8).collect()
}

fn chain(allocator: &Allocator<impl HeapSource>) -> Vec<BlockInfo> {
  allocator.blocks().map(Result::unwrap).collect()
}

proptest! {
  #[test]
  fn chain_stays_coalesced(ops in prop::collection::vec(op(), 1..64)) {
    let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();
    // (offset, requested size, fill seed)
    let mut live: Vec<(usize, usize, usize)> = Vec::new();

    for (step, op) in ops.into_iter().enumerate() {
      match op {
        Op::Malloc(size) => {
          if let Some(offset) = allocator.malloc(size).unwrap() {
            allocator.payload_mut(offset).unwrap()[..size].copy_from_slice(&pattern(step, size));
            live.push((offset, size, step));
          } else {
            prop_assert_eq!(size, 0);
          }
        }
        Op::Free(index) if !live.is_empty() => {
          let (offset, _, _) = live.swap_remove(index % live.len());
          allocator.free(offset).unwrap();
        }
        Op::Realloc(index, size) if !live.is_empty() => {
          let (offset, old_size, seed) = live.swap_remove(index % live.len());
          let kept = old_size.min(size);
          let expected = pattern(seed, old_size);

          if let Some(moved) = allocator.realloc(Some(offset), size).unwrap() {
            prop_assert_eq!(&allocator.payload(moved).unwrap()[..kept], &expected[..kept]);
            allocator.payload_mut(moved).unwrap()[..size].copy_from_slice(&pattern(step, size));
            live.push((moved, size, step));
          } else {
            prop_assert_eq!(size, 0);
          }
        }
        _ => {}
      }

      allocator.check().unwrap();
    }

    for (offset, size, seed) in live {
      let expected = pattern(seed, size);
      prop_assert_eq!(&allocator.payload(offset).unwrap()[..size], &expected[..]);
    }
  }

  #[test]
  fn malloc_then_free_restores_layout(size in 1usize..=4088) {
    let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();
    let warm = allocator.malloc(1).unwrap().unwrap();
    allocator.free(warm).unwrap();

    let top = allocator.top();
    let before = chain(&allocator);

    let offset = allocator.malloc(size).unwrap().unwrap();
    allocator.free(offset).unwrap();

    prop_assert_eq!(allocator.top(), top);
    prop_assert_eq!(chain(&allocator), before);
  }

  #[test]
  fn shrink_then_grow_keeps_prefix(size in 16usize..2048, shrunk in 1usize..16) {
    let mut allocator = Allocator::init(ArenaHeap::new()).unwrap();
    let bytes = pattern(size, size);

    let p = allocator.malloc(size).unwrap().unwrap();
    allocator.payload_mut(p).unwrap()[..size].copy_from_slice(&bytes);
    let _fence = allocator.malloc(8).unwrap().unwrap();

    let q = allocator.realloc(Some(p), shrunk).unwrap().unwrap();
    prop_assert_eq!(q, p);

    let r = allocator.realloc(Some(q), size).unwrap().unwrap();

    prop_assert_eq!(r, p);
    prop_assert_eq!(&allocator.payload(r).unwrap()[..shrunk], &bytes[..shrunk]);
    allocator.check().unwrap();
  }
}
