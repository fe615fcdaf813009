//! Per-address message history, used to tell new arrivals from old ones.

use std::collections::{HashMap, HashSet};

use crate::model::{Address, Message};

/// Messages seen on the last poll of each address, oldest first.
#[derive(Debug, Default)]
pub struct MailboxHistory {
    by_address: HashMap<Address, Vec<Message>>,
}

impl MailboxHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.by_address.clear();
    }

    pub fn messages(&self, address: &Address) -> &[Message] {
        self.by_address
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self, address: &Address) -> usize {
        self.messages(address).len()
    }

    /// Replace the stored set for `address` with `latest`.
    ///
    /// Returns the stored messages paired with whether each id was absent
    /// from the previous set. Read flags already set locally are carried
    /// over, and the set is ordered oldest first.
    pub fn replace(&mut self, address: &Address, latest: Vec<Message>) -> Vec<(Message, bool)> {
        let previous = self.by_address.remove(address).unwrap_or_default();
        let seen: HashSet<&str> = previous.iter().map(|m| m.id.as_str()).collect();
        let read: HashSet<&str> = previous
            .iter()
            .filter(|m| m.read)
            .map(|m| m.id.as_str())
            .collect();

        let mut merged: Vec<(Message, bool)> = latest
            .into_iter()
            .map(|mut message| {
                let is_new = !seen.contains(message.id.as_str());
                message.read |= read.contains(message.id.as_str());
                (message, is_new)
            })
            .collect();
        merged.sort_by_key(|(m, _)| m.received_at);

        self.by_address.insert(
            address.clone(),
            merged.iter().map(|(m, _)| m.clone()).collect(),
        );
        merged
    }

    /// Flag message `id` of `address` as read. Returns whether it exists.
    pub fn mark_read(&mut self, address: &Address, id: &str) -> bool {
        let Some(message) = self
            .by_address
            .get_mut(address)
            .and_then(|messages| messages.iter_mut().find(|m| m.id == id))
        else {
            return false;
        };
        message.read = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn msg(id: &str, minutes_ago: i64) -> Message {
        Message {
            id: id.into(),
            sender: "a@b.co".into(),
            subject: "s".into(),
            body: "b".into(),
            received_at: Utc::now() - Duration::minutes(minutes_ago),
            read: false,
        }
    }

    fn addr() -> Address {
        Address::parse("abc@mail.cx").unwrap()
    }

    #[test]
    fn first_poll_is_all_new() {
        let mut history = MailboxHistory::new();
        let merged = history.replace(&addr(), vec![msg("m_1", 5), msg("m_2", 1)]);
        assert!(merged.iter().all(|(_, is_new)| *is_new));
        assert_eq!(history.len(&addr()), 2);
    }

    #[test]
    fn repeat_poll_has_nothing_new() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("m_1", 5)]);
        let merged = history.replace(&addr(), vec![msg("m_1", 5)]);
        assert!(merged.iter().all(|(_, is_new)| !*is_new));
        assert_eq!(history.len(&addr()), 1);
    }

    #[test]
    fn only_unseen_ids_are_new() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("m_1", 5)]);
        let merged = history.replace(&addr(), vec![msg("m_2", 0), msg("m_1", 5)]);
        let new: Vec<&str> = merged
            .iter()
            .filter(|(_, n)| *n)
            .map(|(m, _)| m.id.as_str())
            .collect();
        assert_eq!(new, vec!["m_2"]);
    }

    #[test]
    fn ordered_oldest_first() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("new", 0), msg("old", 30)]);
        let ids: Vec<&str> = history.messages(&addr()).iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn read_flag_survives_next_poll() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("m_1", 5), msg("m_2", 1)]);
        assert!(history.mark_read(&addr(), "m_1"));
        assert!(!history.mark_read(&addr(), "missing"));

        let merged = history.replace(&addr(), vec![msg("m_1", 5), msg("m_2", 1)]);
        assert!(merged[0].0.read);
        assert!(!merged[1].0.read);
    }

    #[test]
    fn dropped_messages_leave_history() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("m_1", 5)]);
        history.replace(&addr(), Vec::new());
        assert_eq!(history.len(&addr()), 0);
    }

    #[test]
    fn clear_forgets_every_address() {
        let mut history = MailboxHistory::new();
        history.replace(&addr(), vec![msg("m_1", 5)]);
        history.clear();
        assert!(history.messages(&addr()).is_empty());
    }
}
