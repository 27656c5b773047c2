// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use wrmi_client_rs::{cdr::buffer::ByteOrder, client::pool_buffers::BufferPool};

#[test]
fn test_acquire_allocates_at_default_capacity() {
    let mut pool = BufferPool::new(1024, ByteOrder::Big);
    let buf = pool.acquire();
    assert_eq!(buf.capacity(), 1024);
    assert_eq!(buf.order(), ByteOrder::Big);
    assert_eq!(pool.outstanding(), 1);
    pool.release(buf);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn test_pool_grows_and_reuses() {
    let mut pool = BufferPool::new(256, ByteOrder::Big);
    let a = pool.acquire();
    let b = pool.acquire();
    assert_eq!(pool.outstanding(), 2);
    assert_eq!(pool.idle_count(), 0);

    pool.release(a);
    pool.release(b);
    assert_eq!(pool.outstanding(), 0);
    assert_eq!(pool.idle_count(), 2);

    // Reuse does not allocate new idle entries.
    let c = pool.acquire();
    assert_eq!(pool.idle_count(), 1);
    pool.release(c);
    assert_eq!(pool.idle_count(), 2);
}

#[test]
fn test_released_buffer_keeps_growth() {
    let mut pool = BufferPool::new(16, ByteOrder::Big);
    let mut buf = pool.acquire();
    buf.clear();
    buf.write_bytes(&[0u8; 100]);
    let grown = buf.capacity();
    assert!(grown >= 100);
    pool.release(buf);

    // The grown buffer comes back on the next acquire; callers clear it.
    let mut again = pool.acquire();
    assert_eq!(again.capacity(), grown);
    again.clear();
    assert_eq!(again.position(), 0);
    pool.release(again);
}
