use crate::domain::models::PeripheralId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time before the same peripheral is serviced again
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Per-peripheral cooldown gate.
///
/// A peripheral is marked busy the moment it is accepted and stays busy
/// until the cooldown elapses, whatever the outcome of its session. There
/// is no way to release it early.
#[derive(Debug)]
pub struct DebounceRegistry {
    cooldown: Duration,
    /// `None` when the cooldown reaches past what the clock can represent;
    /// such a peripheral stays busy until the registry is cleared.
    busy_until: HashMap<PeripheralId, Option<Instant>>,
}

impl DebounceRegistry {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            busy_until: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Accept `id` unless it is still cooling down.
    pub fn should_accept(&mut self, id: &PeripheralId) -> bool {
        self.should_accept_at(id, Instant::now())
    }

    pub fn should_accept_at(&mut self, id: &PeripheralId, now: Instant) -> bool {
        if self.is_busy_at(id, now) {
            return false;
        }
        self.prune(now);
        self.busy_until.insert(id.clone(), now.checked_add(self.cooldown));
        true
    }

    pub fn is_busy_at(&self, id: &PeripheralId, now: Instant) -> bool {
        self.busy_until
            .get(id)
            .map(|until| still_busy(*until, now))
            .unwrap_or(false)
    }

    /// Drop entries whose cooldown has already elapsed
    pub fn prune(&mut self, now: Instant) {
        self.busy_until.retain(|_, until| still_busy(*until, now));
    }

    pub fn clear(&mut self) {
        self.busy_until.clear();
    }
}

fn still_busy(until: Option<Instant>, now: Instant) -> bool {
    until.map_or(true, |until| now < until)
}

impl Default for DebounceRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_within_cooldown_and_accepts_after() {
        let mut registry = DebounceRegistry::default();
        let id = PeripheralId::from("AA");
        let start = Instant::now();

        assert!(registry.should_accept_at(&id, start));
        assert!(!registry.should_accept_at(&id, start + Duration::from_secs(5)));
        assert!(registry.should_accept_at(&id, start + Duration::from_secs(61)));
    }

    #[test]
    fn clears_exactly_at_cooldown() {
        let mut registry = DebounceRegistry::new(Duration::from_secs(60));
        let id = PeripheralId::from("AA");
        let start = Instant::now();

        assert!(registry.should_accept_at(&id, start));
        assert!(registry.is_busy_at(&id, start + Duration::from_millis(59_999)));
        assert!(!registry.is_busy_at(&id, start + Duration::from_secs(60)));
    }

    #[test]
    fn identities_are_independent() {
        let mut registry = DebounceRegistry::default();
        let start = Instant::now();

        assert!(registry.should_accept_at(&PeripheralId::from("AA"), start));
        assert!(registry.should_accept_at(&PeripheralId::from("BB"), start));
        assert!(!registry.should_accept_at(&PeripheralId::from("AA"), start));
    }

    #[test]
    fn rejection_does_not_extend_cooldown() {
        let mut registry = DebounceRegistry::default();
        let id = PeripheralId::from("AA");
        let start = Instant::now();

        assert!(registry.should_accept_at(&id, start));
        assert!(!registry.should_accept_at(&id, start + Duration::from_secs(59)));
        assert!(registry.should_accept_at(&id, start + Duration::from_secs(60)));
    }

    #[test]
    fn prune_forgets_expired_entries() {
        let mut registry = DebounceRegistry::default();
        let start = Instant::now();
        registry.should_accept_at(&PeripheralId::from("AA"), start);
        registry.should_accept_at(&PeripheralId::from("BB"), start + Duration::from_secs(30));

        registry.prune(start + Duration::from_secs(61));
        assert_eq!(registry.busy_until.len(), 1);

        registry.clear();
        assert!(registry.busy_until.is_empty());
    }

    #[test]
    fn unrepresentable_cooldown_blocks_until_cleared() {
        let mut registry = DebounceRegistry::new(Duration::from_secs(u64::MAX));
        let id = PeripheralId::from("AA");
        let start = Instant::now();

        assert!(registry.should_accept_at(&id, start));
        assert!(!registry.should_accept_at(&id, start + Duration::from_secs(86_400)));

        registry.prune(start + Duration::from_secs(86_400));
        assert!(registry.is_busy_at(&id, start + Duration::from_secs(86_400)));

        registry.clear();
        assert!(registry.should_accept_at(&id, start));
    }

    #[tokio::test(start_paused = true)]
    async fn follows_the_tokio_clock() {
        let mut registry = DebounceRegistry::default();
        let id = PeripheralId::from("AA");

        assert!(registry.should_accept(&id));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!registry.should_accept(&id));
        tokio::time::advance(Duration::from_secs(56)).await;
        assert!(registry.should_accept(&id));
    }
}
