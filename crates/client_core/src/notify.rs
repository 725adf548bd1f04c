//! Single-slot notification queue.
//!
//! At most one notification is visible. New ones wait behind it until it is
//! dismissed or its timeout elapses.

use std::{collections::VecDeque, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct NotificationQueue {
    next_id: u64,
    default_timeout: Duration,
    visible: Option<Notification>,
    pending: VecDeque<Notification>,
}

impl NotificationQueue {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            next_id: 1,
            default_timeout,
            visible: None,
            pending: VecDeque::new(),
        }
    }

    /// Enqueues a notification. Returns it when it became visible immediately.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> Option<&Notification> {
        let notification = Notification {
            id: self.next_id,
            severity,
            message: message.into(),
            timeout: self.default_timeout,
        };
        self.next_id += 1;

        if self.visible.is_some() {
            self.pending.push_back(notification);
            return None;
        }
        self.visible = Some(notification);
        self.visible.as_ref()
    }

    /// Hides the visible notification and returns the next one, if any.
    pub fn dismiss(&mut self) -> Option<&Notification> {
        self.visible = self.pending.pop_front();
        self.visible.as_ref()
    }

    /// Auto-dismiss for notification `id`; ignored unless it is still visible.
    pub fn expire(&mut self, id: u64) -> Option<&Notification> {
        if self.visible.as_ref().map(|n| n.id) != Some(id) {
            return None;
        }
        self.dismiss()
    }

    pub fn visible(&self) -> Option<&Notification> {
        self.visible.as_ref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Notification> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len() + usize::from(self.visible.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notifications_wait_behind_visible_one() {
        let mut queue = NotificationQueue::new(Duration::from_secs(4));
        let first = queue.push(Severity::Info, "saved draft").map(|n| n.id);
        assert_eq!(first, Some(1));
        assert!(queue.push(Severity::Error, "network down").is_none());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.visible().map(|n| n.message.as_str()), Some("saved draft"));

        let next = queue.dismiss().cloned().expect("next visible");
        assert_eq!(next.severity, Severity::Error);
        assert!(queue.dismiss().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn expiry_of_hidden_notification_is_ignored() {
        let mut queue = NotificationQueue::new(Duration::from_secs(4));
        queue.push(Severity::Info, "one");
        queue.push(Severity::Info, "two");
        queue.dismiss();

        assert!(queue.expire(1).is_none());
        assert_eq!(queue.visible().map(|n| n.id), Some(2));
        assert!(queue.expire(2).is_none());
        assert!(queue.is_empty());
    }
}
