use std::collections::BTreeMap;

/// Side transitions that fire on the game clock instead of on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredAction {
    PowerExpiry,
    SlowExpiry,
    BonusSpawn,
    HouseRelease,
    GhostReturn { ghost_id: usize },
}

/// Deferred actions ordered by due time, then by scheduling order.
#[derive(Clone, Debug, Default)]
pub struct Timers {
    queue: BTreeMap<(u64, u64), DeferredAction>,
    next_seq: u64,
}

impl Timers {
    pub fn schedule(&mut self, due_ms: u64, action: DeferredAction) {
        self.queue.insert((due_ms, self.next_seq), action);
        self.next_seq = self.next_seq.saturating_add(1);
    }

    /// Drops any pending copy of `action` before scheduling it again.
    pub fn reschedule(&mut self, due_ms: u64, action: DeferredAction) {
        self.cancel(action);
        self.schedule(due_ms, action);
    }

    pub fn cancel(&mut self, action: DeferredAction) {
        self.queue.retain(|_, pending| *pending != action);
    }

    /// Removes and returns every action due at or before `now_ms`, earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<DeferredAction> {
        let later = self.queue.split_off(&(now_ms.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().collect()
    }

    #[cfg(test)]
    pub fn due_at(&self, action: DeferredAction) -> Option<u64> {
        self.queue
            .iter()
            .find(|(_, pending)| **pending == action)
            .map(|((due_ms, _), _)| *due_ms)
    }

    #[cfg(test)]
    pub fn count(&self, action: DeferredAction) -> usize {
        self.queue.values().filter(|pending| **pending == action).count()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn due_actions_come_out_in_time_then_insertion_order() {
        let mut timers = Timers::default();
        timers.schedule(500, DeferredAction::BonusSpawn);
        timers.schedule(200, DeferredAction::HouseRelease);
        timers.schedule(200, DeferredAction::GhostReturn { ghost_id: 2 });
        timers.schedule(900, DeferredAction::PowerExpiry);

        assert_eq!(
            timers.take_due(500),
            vec![
                DeferredAction::HouseRelease,
                DeferredAction::GhostReturn { ghost_id: 2 },
                DeferredAction::BonusSpawn,
            ]
        );
        assert_eq!(timers.len(), 1);
        assert!(timers.take_due(899).is_empty());
        assert_eq!(timers.take_due(900), vec![DeferredAction::PowerExpiry]);
        assert!(timers.is_empty());
    }

    #[test]
    fn reschedule_replaces_instead_of_stacking() {
        let mut timers = Timers::default();
        timers.schedule(1_000, DeferredAction::PowerExpiry);
        timers.reschedule(1_400, DeferredAction::PowerExpiry);
        assert_eq!(timers.count(DeferredAction::PowerExpiry), 1);
        assert_eq!(timers.due_at(DeferredAction::PowerExpiry), Some(1_400));
        assert!(timers.take_due(1_000).is_empty());
    }

    #[test]
    fn ghost_returns_are_tracked_per_ghost() {
        let mut timers = Timers::default();
        timers.schedule(100, DeferredAction::GhostReturn { ghost_id: 0 });
        timers.schedule(100, DeferredAction::GhostReturn { ghost_id: 1 });
        timers.cancel(DeferredAction::GhostReturn { ghost_id: 0 });
        assert_eq!(
            timers.take_due(100),
            vec![DeferredAction::GhostReturn { ghost_id: 1 }]
        );
    }
}
