//! Bounded window of recently processed event ids.

use std::collections::{HashSet, VecDeque};

use uuid::Uuid;

/// Remembers the last `capacity` event ids, forgetting the oldest first.
#[derive(Debug)]
pub(crate) struct RecentIds {
    capacity: usize,
    order: VecDeque<Uuid>,
    ids: HashSet<Uuid>,
}

impl RecentIds {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    pub(crate) fn contains(&self, id: &Uuid) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` if `id` is already in the window.
    pub(crate) fn insert(&mut self, id: Uuid) -> bool {
        if !self.ids.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut recent = RecentIds::new(3);

        for _ in 0..10 {
            recent.insert(Uuid::new_v4());
        }

        assert_eq!(recent.len(), 3);
        assert_eq!(recent.ids.len(), 3);
    }

    #[test]
    fn test_oldest_id_is_forgotten_first() {
        // Arrange
        let mut recent = RecentIds::new(2);
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();

        // Act
        for id in &ids {
            recent.insert(*id);
        }

        // Assert
        assert!(!recent.contains(&ids[0]));
        assert!(recent.contains(&ids[1]));
        assert!(recent.contains(&ids[2]));
    }

    #[test]
    fn test_duplicate_insert_is_reported() {
        let mut recent = RecentIds::new(4);
        let id = Uuid::new_v4();

        assert!(recent.insert(id));
        assert!(!recent.insert(id));
        assert_eq!(recent.len(), 1);
    }
}
