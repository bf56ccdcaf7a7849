use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use circle_db::{Storage, generate_id, keys, load_from_storage, save_to_storage};
use circle_types::Post;

use crate::auth::{AuthStore, DEMO_USER_ID};
use crate::error::{StoreError, StoreResult};

fn seed_posts() -> Vec<Post> {
    vec![Post {
        id: "post_welcome".to_string(),
        author_id: DEMO_USER_ID.to_string(),
        content: "Welcome! This is where your friends' updates will appear. Create a post to let everyone know you have arrived 🚀".to_string(),
        created_at: Utc::now(),
        like_user_ids: vec![],
    }]
}

/// Posts, newest first.
pub struct PostsStore {
    storage: Arc<dyn Storage>,
    posts: Vec<Post>,
}

impl PostsStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let posts = load_from_storage(storage.as_ref(), keys::POSTS, seed_posts());
        Self { storage, posts }
    }

    fn persist(&self) {
        save_to_storage(self.storage.as_ref(), keys::POSTS, &self.posts);
    }

    pub fn create_post(&mut self, auth: &AuthStore, content: &str) -> StoreResult<&Post> {
        let author = auth
            .current_user()
            .ok_or(StoreError::NotSignedIn("You need to be signed in to post an update."))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::EmptyPost);
        }

        let post = Post {
            id: generate_id("post"),
            author_id: author.id.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
            like_user_ids: vec![],
        };

        info!("Post {} by {}", post.id, post.author_id);
        self.posts.insert(0, post);
        self.persist();

        Ok(&self.posts[0])
    }

    /// Like or unlike `post_id` as the signed-in user. Returns the new like
    /// state, or None when nothing changed.
    pub fn toggle_like(&mut self, auth: &AuthStore, post_id: &str) -> Option<bool> {
        let user = auth.current_user()?;
        let Some(post) = self.posts.iter_mut().find(|p| p.id == post_id) else {
            debug!("toggle_like on unknown post {}", post_id);
            return None;
        };

        let liked = if post.is_liked_by(&user.id) {
            post.like_user_ids.retain(|id| *id != user.id);
            false
        } else {
            post.like_user_ids.push(user.id.clone());
            true
        };

        self.persist();
        Some(liked)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn find_post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Posts by the signed-in user and their friends, in store order.
    pub fn feed(&self, auth: &AuthStore) -> Vec<&Post> {
        let Some(user) = auth.current_user() else {
            return vec![];
        };

        let visible: HashSet<&str> = std::iter::once(user.id.as_str())
            .chain(user.friends.iter().map(String::as_str))
            .collect();

        self.posts
            .iter()
            .filter(|p| visible.contains(p.author_id.as_str()))
            .collect()
    }

    pub fn posts_by_user(&self, user_id: &str) -> Vec<&Post> {
        self.posts.iter().filter(|p| p.author_id == user_id).collect()
    }
}
