use std::collections::VecDeque;

use crate::observability::metrics;

/// Bounded FIFO of messages waiting for the next `Open`.
///
/// When full, the oldest message is dropped to make room.
#[derive(Debug)]
pub struct Outbox {
    queue: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Queue `payload`, returning the message evicted to make room, if any.
    pub fn push(&mut self, payload: Vec<u8>) -> Option<Vec<u8>> {
        let evicted = if self.queue.len() >= self.capacity {
            self.queue.pop_front()
        } else {
            None
        };
        if let Some(ref dropped) = evicted {
            metrics::record_outbox_dropped();
            tracing::warn!(capacity = self.capacity, dropped_bytes = dropped.len(), "Outbox full, dropped oldest message");
        }
        self.queue.push_back(payload);
        evicted
    }

    /// Put back a message that was taken for sending but never went out.
    /// It is older than everything queued, so it goes first.
    pub fn requeue(&mut self, payload: Vec<u8>) {
        if self.queue.len() >= self.capacity {
            metrics::record_outbox_dropped();
            tracing::warn!(capacity = self.capacity, "Outbox full, dropped requeued message");
            return;
        }
        self.queue.push_front(payload);
    }

    /// Take everything, oldest first.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_fifo_order() {
        let mut outbox = Outbox::new(8);
        for m in ["a", "b", "c"] {
            outbox.push(m.into());
        }
        assert_eq!(outbox.drain(), vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut outbox = Outbox::new(2);
        assert!(outbox.push(b"1".to_vec()).is_none());
        assert!(outbox.push(b"2".to_vec()).is_none());
        assert_eq!(outbox.push(b"3".to_vec()), Some(b"1".to_vec()));
        assert_eq!(outbox.drain(), vec![b"2".to_vec(), b"3".to_vec()]);
    }

    #[test]
    fn requeue_goes_first() {
        let mut outbox = Outbox::new(4);
        outbox.push(b"later".to_vec());
        outbox.requeue(b"earlier".to_vec());
        assert_eq!(outbox.drain(), vec![b"earlier".to_vec(), b"later".to_vec()]);
    }

    #[test]
    fn zero_capacity_still_holds_one() {
        let mut outbox = Outbox::new(0);
        outbox.push(b"x".to_vec());
        assert_eq!(outbox.len(), 1);
    }
}
