use crate::domain::payment::AckUpdate;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Mailbox for status updates pushed by the payment provider.
///
/// Holds the latest update per open conversation. A conversation is opened by
/// the provider when it accepts the payment or by the first subscriber, and
/// closed with [`AckInbox::forget`]. Updates for a conversation that is not
/// open are dropped, so a closed conversation stays closed.
#[derive(Clone, Default)]
pub struct AckInbox {
    slots: Arc<DashMap<Uuid, watch::Sender<Option<AckUpdate>>>>,
}

impl AckInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, conversation_id: Uuid) {
        self.slots
            .entry(conversation_id)
            .or_insert_with(|| watch::channel(None).0);
    }

    /// Stores `update` as the latest of its conversation. Returns `false` when
    /// the conversation is not open and the update was dropped.
    pub fn publish(&self, update: AckUpdate) -> bool {
        match self.slots.get(&update.conversation_id) {
            Some(sender) => {
                sender.send_replace(Some(update));
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self, conversation_id: Uuid) -> watch::Receiver<Option<AckUpdate>> {
        self.slots
            .entry(conversation_id)
            .or_insert_with(|| watch::channel(None).0)
            .subscribe()
    }

    /// Drops the slot of a conversation nobody waits for anymore.
    pub fn forget(&self, conversation_id: Uuid) {
        self.slots.remove(&conversation_id);
    }

    /// Forgets `conversation_id` when the returned guard is dropped.
    pub fn forget_on_drop(&self, conversation_id: Uuid) -> ForgetOnDrop {
        ForgetOnDrop {
            inbox: self.clone(),
            conversation_id,
        }
    }

    pub fn pending(&self) -> usize {
        self.slots.len()
    }
}

pub struct ForgetOnDrop {
    inbox: AckInbox,
    conversation_id: Uuid,
}

impl Drop for ForgetOnDrop {
    fn drop(&mut self) {
        self.inbox.forget(self.conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::StatusCode;

    fn update(id: Uuid, status: StatusCode) -> AckUpdate {
        AckUpdate {
            conversation_id: id,
            status,
            message: None,
        }
    }

    #[tokio::test]
    async fn test_update_published_before_subscribe_is_kept() {
        let inbox = AckInbox::new();
        let id = Uuid::new_v4();
        inbox.open(id);
        assert!(inbox.publish(update(id, StatusCode::COMPLETED)));

        let rx = inbox.subscribe(id);
        assert_eq!(rx.borrow().as_ref().map(|u| u.status), Some(StatusCode::COMPLETED));
    }

    #[tokio::test]
    async fn test_subscriber_sees_later_updates() {
        let inbox = AckInbox::new();
        let id = Uuid::new_v4();
        let mut rx = inbox.subscribe(id);

        assert!(inbox.publish(update(id, StatusCode::PROCESSING)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|u| u.status), Some(StatusCode::PROCESSING));

        inbox.forget(id);
        assert_eq!(inbox.pending(), 0);
    }

    #[test]
    fn test_updates_for_closed_conversations_are_dropped() {
        let inbox = AckInbox::new();
        let id = Uuid::new_v4();
        assert!(!inbox.publish(update(id, StatusCode::PROCESSING)));
        assert_eq!(inbox.pending(), 0);

        inbox.open(id);
        inbox.forget(id);
        assert!(!inbox.publish(update(id, StatusCode::COMPLETED)));
        assert_eq!(inbox.pending(), 0);
    }

    #[test]
    fn test_guard_forgets_on_drop() {
        let inbox = AckInbox::new();
        let id = Uuid::new_v4();
        let _rx = inbox.subscribe(id);
        let guard = inbox.forget_on_drop(id);
        assert_eq!(inbox.pending(), 1);
        drop(guard);
        assert_eq!(inbox.pending(), 0);
    }
}
