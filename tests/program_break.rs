use tagalloc::{Allocator, BreakHeap, HeapSource};

#[test]
fn break_heap_moves_the_program_break() {
  let mut allocator = Allocator::init(BreakHeap::new()).unwrap();

  let base = allocator.heap().base();
  assert!(!base.is_null());
  assert_eq!(base as usize % 8, 0);

  let p = allocator.malloc(100).unwrap().unwrap();
  assert!(BreakHeap::program_break() as usize >= base as usize + allocator.top());

  unsafe {
    let ptr = allocator.as_ptr(p) as *mut u64;
    assert_eq!(ptr as usize % 8, 0);
    ptr.write(0x1122334455667788);
  }
  assert_eq!(
    &allocator.payload(p).unwrap()[..8],
    &0x1122334455667788u64.to_ne_bytes()
  );

  let q = allocator.realloc(Some(p), 20).unwrap();
  assert_eq!(q, Some(p));

  allocator.free(p).unwrap();
  let stats = allocator.check().unwrap();

  assert_eq!(stats.allocated_blocks, 0);
  assert_eq!(stats.heap_size, allocator.heap().top());
}
