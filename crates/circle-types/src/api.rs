use serde::{Deserialize, Serialize};

use crate::models::{DirectMessage, User};

// -- Auth --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthCredentials {
    pub email: String,
    pub password: String,
}

// -- Profile --

/// Partial profile edit. Missing or blank fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
}

/// A user as seen from the signed-in user's directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    #[serde(flatten)]
    pub user: User,
    pub is_friend: bool,
}

// -- Messages --

/// One conversation in the inbox. `messages` is newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user_id: String,
    pub messages: Vec<DirectMessage>,
    pub last_message: Option<DirectMessage>,
    pub unread_count: usize,
}
