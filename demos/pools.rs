use std::{io::Read, ptr};

use bulkpool::{BuddyPool, LinearPool, Pool, PoolRegistry};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the mapped bulk with tools like `pmap`,
/// `htop` or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_stats<P: Pool>(
  label: &str,
  pool: &P,
) {
  let stats = pool.stats();
  println!(
    "[{}] PID = {}, capacity = {}, available = {}, used = {}, hwm = {}",
    label,
    std::process::id(),
    stats.capacity,
    stats.available,
    stats.used,
    stats.hwm,
  );
}

fn main() {
  let mut buddies = PoolRegistry::<BuddyPool>::new();

  // --------------------------------------------------------------------
  // 1) Create a buddy pool in slot 0. The request is promoted to a power
  //    of two; the whole bulk is mapped once, right here.
  // --------------------------------------------------------------------
  let capacity = buddies.create(60_000, 0);
  println!("[1] Requested 60000 bytes, got a {capacity} byte buddy pool");

  let Some(pool) = buddies.instance_mut(0) else {
    println!("[1] Could not map the pool");
    return;
  };
  print_stats("start", pool);
  block_until_enter_pressed();

  unsafe {
    // --------------------------------------------------------------------
    // 2) Allocate 3000 bytes. The pool splits blocks down to 4 KiB.
    // --------------------------------------------------------------------
    let first = pool.alloc(3000).unwrap();
    println!("\n[2] alloc(3000) = {:?}, block size = {}", first, pool.usable_size(first));
    ptr::write_bytes(first.as_ptr(), 0xAB, 3000);
    print_stats("2", pool);

    // --------------------------------------------------------------------
    // 3) Allocate 16 bytes, the smallest block.
    // --------------------------------------------------------------------
    let second = pool.alloc(16).unwrap();
    println!(
      "\n[3] alloc(16) = {:?}, address % 16 = {}",
      second,
      second.as_ptr() as usize % 16
    );
    print_stats("3", pool);
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Grow the first block. The data moves into an 8 KiB block.
    // --------------------------------------------------------------------
    let grown = pool.realloc(Some(first), 6000).unwrap();
    println!(
      "\n[4] realloc(6000) = {:?}, first byte still 0x{:X}",
      grown,
      grown.as_ptr().read()
    );
    print_stats("4", pool);

    // --------------------------------------------------------------------
    // 5) Free everything. Buddies merge all the way back to one block.
    // --------------------------------------------------------------------
    pool.free(second);
    pool.free(grown);
    println!("\n[5] Freed both blocks");
    print_stats("5", pool);
    println!("[5] Peak usage was {} bytes", pool.reset());
  }

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) A linear pool: frees out of order are deferred until the top goes.
  // --------------------------------------------------------------------
  let Ok(mut stack) = LinearPool::new(256) else {
    println!("[6] Could not map the linear pool");
    return;
  };

  let cells: Vec<_> = (0..3).filter_map(|_| stack.alloc(10)).collect();
  println!("\n[6] Three alloc(10) on a linear pool, current = {}", stack.current());

  unsafe {
    stack.free(cells[1]);
    println!("[6] Freed the middle cell, current = {}", stack.current());

    stack.free(cells[2]);
    println!("[6] Freed the top cell, current = {}", stack.current());

    stack.free(cells[0]);
    println!("[6] Freed the bottom cell, current = {}", stack.current());
  }

  // --------------------------------------------------------------------
  // 7) End of demo. Destroying the slot unmaps the bulk.
  // --------------------------------------------------------------------
  buddies.destroy(0);
  println!("\n[7] End of example. Slot 0 destroyed and its bulk unmapped.");
}
