use crate::connection::SubscriberId;
use events::TicketId;
use std::collections::{HashMap, HashSet};

/// Two-way index of watch relations: subscriber → tickets and ticket → subscribers.
///
/// Not synchronized on its own; the hub keeps it behind a single lock so both
/// indices are always updated together.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    by_subscriber: HashMap<SubscriberId, HashSet<TicketId>>,
    by_ticket: HashMap<TicketId, HashSet<SubscriberId>>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation. Returns `false` if it already existed.
    pub fn watch(&mut self, subscriber_id: &str, ticket_id: TicketId) -> bool {
        let added = self
            .by_subscriber
            .entry(subscriber_id.to_string())
            .or_default()
            .insert(ticket_id);

        if added {
            self.by_ticket
                .entry(ticket_id)
                .or_default()
                .insert(subscriber_id.to_string());
        }
        added
    }

    pub fn is_watching(&self, subscriber_id: &str, ticket_id: TicketId) -> bool {
        self.by_subscriber
            .get(subscriber_id)
            .is_some_and(|tickets| tickets.contains(&ticket_id))
    }

    /// Number of tickets the subscriber watches.
    pub fn watch_count(&self, subscriber_id: &str) -> usize {
        self.by_subscriber.get(subscriber_id).map_or(0, HashSet::len)
    }

    /// Remove a relation. Returns `false` if it did not exist.
    pub fn unwatch(&mut self, subscriber_id: &str, ticket_id: TicketId) -> bool {
        let Some(tickets) = self.by_subscriber.get_mut(subscriber_id) else {
            return false;
        };
        if !tickets.remove(&ticket_id) {
            return false;
        }
        if tickets.is_empty() {
            self.by_subscriber.remove(subscriber_id);
        }
        self.detach_ticket(ticket_id, subscriber_id);
        true
    }

    /// Remove every relation of a subscriber. Returns how many were removed.
    pub fn remove_subscriber(&mut self, subscriber_id: &str) -> usize {
        let Some(tickets) = self.by_subscriber.remove(subscriber_id) else {
            return 0;
        };
        for ticket_id in &tickets {
            self.detach_ticket(*ticket_id, subscriber_id);
        }
        tickets.len()
    }

    /// Snapshot of the subscribers currently watching a ticket.
    pub fn watchers_of(&self, ticket_id: TicketId) -> Vec<SubscriberId> {
        self.by_ticket
            .get(&ticket_id)
            .map(|subscribers| subscribers.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tickets watched by a subscriber, in ascending order.
    pub fn watched_by(&self, subscriber_id: &str) -> Vec<TicketId> {
        let mut tickets: Vec<TicketId> = self
            .by_subscriber
            .get(subscriber_id)
            .map(|tickets| tickets.iter().copied().collect())
            .unwrap_or_default();
        tickets.sort_unstable();
        tickets
    }

    pub fn relation_count(&self) -> usize {
        self.by_subscriber.values().map(HashSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.by_subscriber.clear();
        self.by_ticket.clear();
    }

    fn detach_ticket(&mut self, ticket_id: TicketId, subscriber_id: &str) {
        if let Some(subscribers) = self.by_ticket.get_mut(&ticket_id) {
            subscribers.remove(subscriber_id);
            // Clean up empty ticket entries
            if subscribers.is_empty() {
                self.by_ticket.remove(&ticket_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_is_idempotent() {
        let mut registry = WatcherRegistry::new();
        assert!(registry.watch("u1", 7));
        assert!(!registry.watch("u1", 7));
        assert_eq!(registry.relation_count(), 1);
        assert_eq!(registry.watchers_of(7), vec!["u1".to_string()]);
    }

    #[test]
    fn unwatch_keeps_both_indices_in_sync() {
        let mut registry = WatcherRegistry::new();
        registry.watch("u1", 7);
        registry.watch("u2", 7);

        assert!(registry.unwatch("u2", 7));
        assert!(!registry.unwatch("u2", 7));
        assert_eq!(registry.watchers_of(7), vec!["u1".to_string()]);
        assert!(registry.watched_by("u2").is_empty());
    }

    #[test]
    fn unwatch_unknown_relation_reports_false() {
        let mut registry = WatcherRegistry::new();
        registry.watch("u1", 1);
        assert!(!registry.unwatch("u1", 2));
        assert!(!registry.unwatch("nobody", 1));
    }

    #[test]
    fn remove_subscriber_drops_all_relations() {
        let mut registry = WatcherRegistry::new();
        registry.watch("u1", 3);
        registry.watch("u1", 1);
        registry.watch("u2", 1);

        assert_eq!(registry.watched_by("u1"), vec![1, 3]);
        assert_eq!(registry.remove_subscriber("u1"), 2);

        assert!(registry.watchers_of(3).is_empty());
        assert_eq!(registry.watchers_of(1), vec!["u2".to_string()]);
        assert!(registry.watched_by("u1").is_empty());
        assert_eq!(registry.remove_subscriber("u1"), 0);
    }
}
