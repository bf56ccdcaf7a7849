use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use circle_db::{Storage, generate_id, keys, load_from_storage, save_to_storage};
use circle_types::{ConversationSummary, DirectMessage};

use crate::auth::AuthStore;
use crate::error::{StoreError, StoreResult};

pub struct MessagesStore {
    storage: Arc<dyn Storage>,
    messages: Vec<DirectMessage>,
}

impl MessagesStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let messages = load_from_storage(storage.as_ref(), keys::MESSAGES, Vec::new());
        Self { storage, messages }
    }

    fn persist(&self) {
        save_to_storage(self.storage.as_ref(), keys::MESSAGES, &self.messages);
    }

    pub fn send_message(
        &mut self,
        auth: &AuthStore,
        recipient_id: &str,
        body: &str,
    ) -> StoreResult<&DirectMessage> {
        let sender = auth
            .current_user()
            .ok_or(StoreError::NotSignedIn("Only signed in users can send messages."))?;

        let body = body.trim();
        if body.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let message = DirectMessage {
            id: generate_id("message"),
            sender_id: sender.id.clone(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
            // notes to self start out read
            read: sender.id == recipient_id,
        };

        info!("Message {} from {} to {}", message.id, message.sender_id, message.recipient_id);
        self.messages.push(message);
        self.persist();

        Ok(&self.messages[self.messages.len() - 1])
    }

    /// Mark everything `other_user_id` sent to the signed-in user as read.
    /// Returns how many messages changed.
    pub fn mark_conversation_as_read(&mut self, auth: &AuthStore, other_user_id: &str) -> usize {
        let Some(user) = auth.current_user() else {
            return 0;
        };

        let mut changed = 0;
        for message in &mut self.messages {
            if message.sender_id == other_user_id && message.is_unread_for(&user.id) {
                message.read = true;
                changed += 1;
            }
        }

        if changed > 0 {
            debug!("Marked {} messages from {} as read", changed, other_user_id);
            self.persist();
        }
        changed
    }

    /// Messages between the signed-in user and `other_user_id`, oldest first.
    pub fn conversation_with(&self, auth: &AuthStore, other_user_id: &str) -> Vec<&DirectMessage> {
        let Some(user) = auth.current_user() else {
            return vec![];
        };

        let mut conversation: Vec<&DirectMessage> = self
            .messages
            .iter()
            .filter(|m| m.between(&user.id, other_user_id))
            .collect();
        conversation.sort_by_key(|m| m.created_at);
        conversation
    }

    /// One summary per counterpart, in order of first appearance.
    pub fn conversations(&self, auth: &AuthStore) -> Vec<ConversationSummary> {
        let Some(user) = auth.current_user() else {
            return vec![];
        };

        let mut grouped: Vec<(String, Vec<DirectMessage>)> = Vec::new();
        for message in self.messages.iter().filter(|m| m.involves(&user.id)) {
            let other = message.counterpart(&user.id);
            match grouped.iter_mut().find(|(id, _)| id == other) {
                Some((_, messages)) => messages.push(message.clone()),
                None => grouped.push((other.to_string(), vec![message.clone()])),
            }
        }

        grouped
            .into_iter()
            .map(|(user_id, mut messages)| {
                // stable: equal timestamps keep storage order
                messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                let unread_count = messages.iter().filter(|m| m.is_unread_for(&user.id)).count();

                ConversationSummary {
                    user_id,
                    last_message: messages.first().cloned(),
                    messages,
                    unread_count,
                }
            })
            .collect()
    }

    pub fn unread_total(&self, auth: &AuthStore) -> usize {
        let Some(user) = auth.current_user() else {
            return 0;
        };

        self.messages.iter().filter(|m| m.is_unread_for(&user.id)).count()
    }

    pub fn all_messages(&self) -> &[DirectMessage] {
        &self.messages
    }
}
