pub mod api;
pub mod models;

pub use api::{AuthCredentials, ConversationSummary, DirectoryEntry, ProfileUpdate, RegisterRequest};
pub use models::{DirectMessage, FriendRequest, FriendRequestStatus, Post, User};
