//! # Batch Scheduler Tests
//!
//! Double-buffered batch loading, in-order fetch with wrap-around, batch ending,
//! partition priority and back-pressure closing.

use pretty_assertions::assert_eq;
use shadersim_core::common::{GroupId, SlotId};
use shadersim_core::core::fetch::pool::{SlotStatus, ThreadSlotPool};
use shadersim_core::core::fetch::scheduler::{BatchScheduler, SchedulingPolicy};
use shadersim_core::core::protocol::{InputMode, Partition, ShaderWork};

/// A full pool of ready slots; `partition_of` picks each slot's partition.
fn ready_pool(total: u32, group: u32, partition_of: impl Fn(u32) -> Partition) -> ThreadSlotPool {
    let mut pool = ThreadSlotPool::new(total, total * 4, group);
    for i in 0..total {
        let slot = pool.acquire(partition_of(i), 1).unwrap();
        pool.slot_mut(slot).unwrap().work = Some(ShaderWork::new(u64::from(i), InputMode::Vertex));
        pool.set_status(slot, SlotStatus::Ready).unwrap();
    }
    pool
}

#[test]
fn test_last_item_closes_batch_and_loading_moves_on() {
    let mut pool = ready_pool(8, 2, |_| Partition::Vertex);
    pool.slot_mut(SlotId(3)).unwrap().work = Some(ShaderWork::new(3, InputMode::Vertex).last());
    let mut b = BatchScheduler::new(4, 2, 1000);

    b.on_activated(GroupId(0), &pool, 0).unwrap();
    b.on_activated(GroupId(1), &pool, 0).unwrap();
    b.on_activated(GroupId(2), &pool, 0).unwrap();
    b.on_activated(GroupId(3), &pool, 0).unwrap();

    assert_eq!(b.fetch_batch(Partition::Vertex), &[GroupId(0), GroupId(1)]);
    assert_eq!(b.load_batch(Partition::Vertex), &[GroupId(2), GroupId(3)]);
    assert!(!b.load_closed(Partition::Vertex));
}

#[test]
fn test_closed_batch_rounds_until_its_threads_end() {
    let mut pool = ready_pool(8, 2, |_| Partition::Vertex);
    pool.slot_mut(SlotId(3)).unwrap().work = Some(ShaderWork::new(3, InputMode::Vertex).last());
    let mut b = BatchScheduler::new(4, 2, 1000);
    for g in 0..4 {
        b.on_activated(GroupId(g), &pool, 0).unwrap();
    }

    let round: Vec<_> = (0..3).map(|_| b.select(&pool, 1).unwrap()).collect();
    assert_eq!(round, vec![Some(GroupId(0)), Some(GroupId(1)), Some(GroupId(0))]);

    for slot in 0..4 {
        assert_eq!(b.thread_finished(SlotId(slot), &pool).unwrap(), vec![SlotId(slot)]);
        if slot == 0 {
            assert!(b.ending(Partition::Vertex));
        }
    }
    assert!(!b.ending(Partition::Vertex));
    assert_eq!(b.fetch_batch(Partition::Vertex), &[GroupId(2), GroupId(3)]);

    assert_eq!(b.select(&pool, 2).unwrap(), Some(GroupId(2)));
    assert_eq!(b.select(&pool, 2).unwrap(), Some(GroupId(3)));
    // The second batch is still open, so it does not wrap.
    assert_eq!(b.select(&pool, 3).unwrap(), None);
}

#[test]
fn test_unready_group_stops_selection() {
    let mut pool = ready_pool(4, 2, |_| Partition::Vertex);
    let mut b = BatchScheduler::new(2, 2, 1000);
    b.on_activated(GroupId(0), &pool, 0).unwrap();
    pool.set_status(SlotId(1), SlotStatus::Blocked).unwrap();
    assert_eq!(b.select(&pool, 1).unwrap(), None);
    pool.set_status(SlotId(1), SlotStatus::Ready).unwrap();
    assert_eq!(b.select(&pool, 2).unwrap(), Some(GroupId(0)));
}

#[test]
fn test_fetch_delay_holds_group() {
    let mut pool = ready_pool(4, 2, |_| Partition::Vertex);
    let mut b = BatchScheduler::new(2, 2, 1000);
    b.on_activated(GroupId(0), &pool, 0).unwrap();
    pool.slot_mut(SlotId(0)).unwrap().next_fetch_cycle = 6;
    assert_eq!(b.select(&pool, 5).unwrap(), None);
    assert_eq!(b.select(&pool, 6).unwrap(), Some(GroupId(0)));
}

#[test]
fn test_vertex_batches_take_priority() {
    let pool = ready_pool(8, 2, |i| if i < 4 { Partition::Fragment } else { Partition::Vertex });
    let mut b = BatchScheduler::new(4, 2, 1000);
    b.on_activated(GroupId(0), &pool, 0).unwrap();

    // Vertex is current and empty: the first call only moves to the fragment batch.
    assert_eq!(b.select(&pool, 1).unwrap(), None);
    assert_eq!(b.current_partition(), Partition::Fragment.index());
    assert_eq!(b.select(&pool, 1).unwrap(), Some(GroupId(0)));

    b.on_activated(GroupId(2), &pool, 1).unwrap();
    assert_eq!(b.select(&pool, 2).unwrap(), None);
    assert_eq!(b.current_partition(), Partition::Vertex.index());
    assert_eq!(b.select(&pool, 2).unwrap(), Some(GroupId(2)));
}

#[test]
fn test_backpressure_closes_current_load_batch() {
    let pool = ready_pool(8, 2, |_| Partition::Vertex);
    let mut b = BatchScheduler::new(4, 2, 1000);
    b.backpressure();
    assert!(!b.load_closed(Partition::Vertex));

    b.on_activated(GroupId(0), &pool, 0).unwrap();
    b.backpressure();
    assert_eq!(b.load_batch(Partition::Vertex), &[] as &[GroupId]);
    assert_eq!(b.fetch_batch(Partition::Vertex), &[GroupId(0)]);

    // Later groups wait in the other buffer while the closed batch rounds.
    b.on_activated(GroupId(1), &pool, 0).unwrap();
    assert_eq!(b.select(&pool, 1).unwrap(), Some(GroupId(0)));
    assert_eq!(b.select(&pool, 1).unwrap(), Some(GroupId(0)));
}
