//! Floods a bounded drop-oldest queue from multiple producer threads well
//! past its capacity and checks the queue never deadlocks, never exceeds
//! capacity, and accounts for every dropped item.

use std::sync::Arc;
use std::thread;

use alarm_core::queue::BoundedDropOldest;

#[test]
fn flood_from_many_threads_stays_within_capacity() {
    const CAPACITY: usize = 32;
    const PRODUCERS: u64 = 8;
    const PER_PRODUCER: u64 = CAPACITY as u64 * 10;

    let queue = Arc::new(BoundedDropOldest::<u64>::new(CAPACITY));
    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(queue.len(), CAPACITY);
    let total_pushed = PRODUCERS * PER_PRODUCER;
    assert_eq!(queue.dropped_count() + CAPACITY as u64, total_pushed);

    queue.close();
    let mut drained = 0;
    while queue.try_pop().is_some() {
        drained += 1;
    }
    assert_eq!(drained, CAPACITY);
    assert!(queue.pop_timeout(std::time::Duration::from_millis(50)).is_none());
}
