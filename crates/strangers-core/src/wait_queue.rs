//! Users waiting for a partner, oldest first.

use std::collections::VecDeque;

use strangers_common::UserId;

use crate::error::MatchError;

/// FIFO of waiting users with no duplicates.
///
/// Queues stay small (a user only sits here until the next request comes
/// in), so lookups are linear scans over a `VecDeque`.
#[derive(Debug, Default, Clone)]
pub struct WaitQueue {
    entries: VecDeque<UserId>,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to the back of the queue.
    pub fn enqueue(&mut self, id: UserId) -> Result<(), MatchError> {
        if self.contains(&id) {
            return Err(MatchError::AlreadyQueued(id));
        }
        self.entries.push_back(id);
        Ok(())
    }

    /// Remove and return the longest-waiting user.
    pub fn dequeue_oldest(&mut self) -> Result<UserId, MatchError> {
        self.entries.pop_front().ok_or(MatchError::Empty)
    }

    /// Put a user straight back at the front, undoing a `dequeue_oldest`
    /// whose follow-up failed.
    pub fn requeue_front(&mut self, id: UserId) -> Result<(), MatchError> {
        self.insert(0, id)
    }

    /// Put `id` back at `index` (clamped to the back), undoing a `remove`.
    pub fn insert(&mut self, index: usize, id: UserId) -> Result<(), MatchError> {
        if self.contains(&id) {
            return Err(MatchError::AlreadyQueued(id));
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, id);
        Ok(())
    }

    /// Zero-based place of `id` in line.
    pub fn position(&self, id: &UserId) -> Option<usize> {
        self.entries.iter().position(|queued| queued == id)
    }

    /// Remove `id` wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, id: &UserId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Waiting users, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.entries.iter()
    }
}
