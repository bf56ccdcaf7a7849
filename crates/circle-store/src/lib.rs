pub mod auth;
pub mod error;
pub mod friends;
pub mod messages;
pub mod posts;

use std::sync::Arc;

use tracing::info;

use circle_db::Storage;
use circle_types::User;

pub use auth::AuthStore;
pub use error::{StoreError, StoreResult};
pub use friends::FriendsStore;
pub use messages::MessagesStore;
pub use posts::PostsStore;

/// Every store over one shared storage namespace. Fields are public so
/// callers can borrow two stores at once, e.g.
/// `circle.friends.accept_request(&mut circle.auth, id)`.
pub struct Circle {
    pub auth: AuthStore,
    pub friends: FriendsStore,
    pub messages: MessagesStore,
    pub posts: PostsStore,
}

impl Circle {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let circle = Self {
            auth: AuthStore::open(storage.clone()),
            friends: FriendsStore::open(storage.clone()),
            messages: MessagesStore::open(storage.clone()),
            posts: PostsStore::open(storage),
        };

        info!(
            users = circle.auth.users().len(),
            posts = circle.posts.posts().len(),
            requests = circle.friends.all_requests().len(),
            messages = circle.messages.all_messages().len(),
            "Circle loaded"
        );
        circle
    }

    /// The signed-in user, or `NotSignedIn`.
    pub fn require_user(&self) -> StoreResult<&User> {
        self.auth
            .current_user()
            .ok_or(StoreError::NotSignedIn("You need to be signed in."))
    }
}
