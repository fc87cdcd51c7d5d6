use std::io::{Read, Write};

use tagalloc::{Allocator, BreakHeap, HeapSource, Result};

/// Pauses between steps so the process can be inspected from outside.
fn pause() {
  print!("\n(hit return for the next step) ");
  let _ = std::io::stdout().flush();
  let _ = std::io::stdin().bytes().next();
}

fn show_break(step: &str) {
  println!("  brk @ {:<18?} {}", BreakHeap::program_break(), step);
}

/// Prints every block between the prologue and the epilogue.
fn print_blocks(allocator: &Allocator<BreakHeap>) -> Result<()> {
  for block in allocator.blocks() {
    let block = block?;
    println!(
      "    {:#06x}  {:>6} bytes  {}",
      block.offset,
      block.size,
      if block.allocated { "allocated" } else { "free" }
    );
  }

  let stats = allocator.check()?;
  println!(
    "    heap = {} bytes, free = {} bytes in {} block(s)",
    stats.heap_size, stats.free_bytes, stats.free_blocks
  );

  Ok(())
}

fn main() -> Result<()> {
  println!("walkthrough pid {}", std::process::id());
  show_break("start");

  let mut allocator = Allocator::init(BreakHeap::new())?;
  println!("\n[0] Heap initialized at {:?}", allocator.heap().base());
  show_break("after init");
  pause();

  // --------------------------------------------------------------------
  // 1) The first allocation finds nothing and grows the heap by a chunk.
  // --------------------------------------------------------------------
  let Some(first) = allocator.malloc(100)? else {
    return Ok(());
  };
  allocator.payload_mut(first)?[..4].copy_from_slice(&0xDEADBEEFu32.to_ne_bytes());
  println!("\n[1] malloc(100) = {:#x}", first);
  print_blocks(&allocator)?;
  show_break("after first malloc");
  pause();

  // --------------------------------------------------------------------
  // 2) The second allocation is carved from the free remainder.
  // --------------------------------------------------------------------
  let second = allocator.malloc(200)?;
  println!("\n[2] malloc(200) = {:x?}", second);
  print_blocks(&allocator)?;
  pause();

  // --------------------------------------------------------------------
  // 3) Free the first block and ask for less: first fit reuses it.
  // --------------------------------------------------------------------
  allocator.free(first)?;
  let third = allocator.malloc(50)?;
  println!(
    "\n[3] free({:#x}); malloc(50) = {:x?} (reused: {})",
    first,
    third,
    third == Some(first)
  );
  print_blocks(&allocator)?;
  pause();

  // --------------------------------------------------------------------
  // 4) Grow the third block past its neighbor: it has to move.
  // --------------------------------------------------------------------
  let moved = allocator.realloc(third, 1000)?;
  println!("\n[4] realloc({:x?}, 1000) = {:x?}", third, moved);
  print_blocks(&allocator)?;
  pause();

  // --------------------------------------------------------------------
  // 5) A request larger than a chunk grows the heap by exactly its size.
  // --------------------------------------------------------------------
  show_break("before large malloc");
  let before = allocator.heap().top();
  let big = allocator.malloc(64 * 1024)?;
  println!(
    "\n[5] malloc(64 KiB) = {:x?}, heap grew by {} bytes",
    big,
    allocator.heap().top() - before
  );
  show_break("after large malloc");

  println!("\n[6] End of walkthrough. The heap is never returned to the OS.");

  Ok(())
}
