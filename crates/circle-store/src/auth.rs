use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info};

use circle_db::{Storage, generate_id, keys, load_from_storage, remove_from_storage, save_to_storage};
use circle_types::{AuthCredentials, DirectoryEntry, ProfileUpdate, RegisterRequest, User};

use crate::error::{StoreError, StoreResult};

pub const DEMO_USER_ID: &str = "user_demo";

const DEFAULT_BIO: &str = "Tell the world about yourself.";

fn default_users() -> Vec<User> {
    vec![User {
        id: DEMO_USER_ID.to_string(),
        name: "Demo User".to_string(),
        email: "demo@social.app".to_string(),
        password: "password123".to_string(),
        bio: "👋 Welcome to your new social app! Edit your profile to make it yours.".to_string(),
        avatar_color: "#2563eb".to_string(),
        friends: vec![],
    }]
}

fn random_avatar_color() -> String {
    let value: u32 = rand::rng().random_range(0..0xff_ffff);
    format!("#{:06x}", value)
}

/// User records plus the session pointer every other store reads.
pub struct AuthStore {
    storage: Arc<dyn Storage>,
    users: Vec<User>,
    current_user_id: Option<String>,
    error: Option<String>,
}

impl AuthStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let users = load_from_storage(storage.as_ref(), keys::USERS, default_users());
        let current_user_id = load_from_storage(storage.as_ref(), keys::SESSION, None::<String>);

        debug!(users = users.len(), signed_in = current_user_id.is_some(), "Auth store loaded");
        Self {
            storage,
            users,
            current_user_id,
            error: None,
        }
    }

    fn persist(&self) {
        save_to_storage(self.storage.as_ref(), keys::USERS, &self.users);
        match &self.current_user_id {
            Some(id) => save_to_storage(self.storage.as_ref(), keys::SESSION, id),
            None => remove_from_storage(self.storage.as_ref(), keys::SESSION),
        }
    }

    fn fail(&mut self, err: StoreError) -> StoreError {
        self.error = Some(err.to_string());
        err
    }

    pub fn register(&mut self, req: RegisterRequest) -> StoreResult<&User> {
        self.error = None;

        let email = req.email.trim().to_lowercase();
        if self.find_user_by_email(&email).is_some() {
            return Err(self.fail(StoreError::EmailTaken));
        }

        let user = User {
            id: generate_id("user"),
            name: req.name.trim().to_string(),
            email,
            password: req.password,
            bio: DEFAULT_BIO.to_string(),
            avatar_color: random_avatar_color(),
            friends: vec![],
        };

        info!("Registered {} <{}>", user.id, user.email);
        self.current_user_id = Some(user.id.clone());
        self.users.push(user);
        self.persist();

        Ok(&self.users[self.users.len() - 1])
    }

    pub fn login(&mut self, credentials: AuthCredentials) -> StoreResult<&User> {
        self.error = None;

        let user_id = self
            .find_user_by_email(credentials.email.trim())
            .filter(|user| user.password == credentials.password)
            .map(|user| user.id.clone());
        let Some(user_id) = user_id else {
            return Err(self.fail(StoreError::InvalidCredentials));
        };

        info!("Signed in as {}", user_id);
        self.current_user_id = Some(user_id);
        self.persist();

        self.current_user().ok_or(StoreError::InvalidCredentials)
    }

    pub fn logout(&mut self) {
        if let Some(id) = self.current_user_id.take() {
            info!("Signed out {}", id);
        }
        self.persist();
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) {
        let Some(user) = self.current_user_mut() else {
            debug!("Profile update ignored: nobody signed in");
            return;
        };

        if let Some(name) = non_blank(update.name.as_deref()) {
            user.name = name;
        }
        if let Some(bio) = non_blank(update.bio.as_deref()) {
            user.bio = bio;
        }

        self.persist();
    }

    /// Link the signed-in user and `friend_id` in both directions.
    pub fn add_friend(&mut self, friend_id: &str) {
        let Some((current, friend)) = self.pair_indices(friend_id) else {
            debug!("add_friend({}) ignored", friend_id);
            return;
        };

        let friend_user_id = self.users[friend].id.clone();
        let current_user_id = self.users[current].id.clone();

        if !self.users[current].is_friend_with(&friend_user_id) {
            self.users[current].friends.push(friend_user_id.clone());
        }
        if !self.users[friend].is_friend_with(&current_user_id) {
            self.users[friend].friends.push(current_user_id.clone());
        }

        info!("{} and {} are now friends", current_user_id, friend_user_id);
        self.persist();
    }

    pub fn remove_friend(&mut self, friend_id: &str) {
        let Some((current, friend)) = self.pair_indices(friend_id) else {
            debug!("remove_friend({}) ignored", friend_id);
            return;
        };

        let friend_user_id = self.users[friend].id.clone();
        let current_user_id = self.users[current].id.clone();

        self.users[current].friends.retain(|id| *id != friend_user_id);
        self.users[friend].friends.retain(|id| *id != current_user_id);

        info!("{} and {} are no longer friends", current_user_id, friend_user_id);
        self.persist();
    }

    /// Indices of (signed-in user, other user). None when signed out, when the
    /// other user is the signed-in one, or when either record is missing.
    fn pair_indices(&self, other_id: &str) -> Option<(usize, usize)> {
        let current_id = self.current_user_id.as_deref()?;
        if current_id == other_id {
            return None;
        }

        let current = self.users.iter().position(|u| u.id == current_id)?;
        let other = self.users.iter().position(|u| u.id == other_id)?;
        Some((current, other))
    }

    pub fn reset_error(&mut self) {
        self.error = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user_id.is_some()
    }

    pub fn current_user_id(&self) -> Option<&str> {
        self.current_user_id.as_deref()
    }

    /// The signed-in user's record. None also covers a stale session that
    /// points at a user no longer present.
    pub fn current_user(&self) -> Option<&User> {
        let id = self.current_user_id.as_deref()?;
        self.find_user(id)
    }

    fn current_user_mut(&mut self) -> Option<&mut User> {
        let id = self.current_user_id.as_deref()?;
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email_matches(email))
    }

    pub fn friend_directory(&self) -> Vec<DirectoryEntry> {
        let current = self.current_user();

        self.users
            .iter()
            .filter(|u| Some(u.id.as_str()) != self.current_user_id.as_deref())
            .map(|u| DirectoryEntry {
                user: u.clone(),
                is_friend: current.is_some_and(|c| c.is_friend_with(&u.id)),
            })
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circle_db::MemoryStorage;

    fn store() -> AuthStore {
        AuthStore::open(Arc::new(MemoryStorage::new()))
    }

    fn register(store: &mut AuthStore, name: &str, email: &str) -> String {
        store
            .register(RegisterRequest {
                name: name.into(),
                email: email.into(),
                password: "hunter22".into(),
            })
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn seeds_demo_user() {
        let store = store();
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.users()[0].id, DEMO_USER_ID);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn register_normalizes_and_signs_in() {
        let mut store = store();
        let id = register(&mut store, "  Ada  ", " Ada@Example.COM ");

        let user = store.current_user().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.name, "Ada");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.bio, DEFAULT_BIO);
        assert_eq!(user.avatar_color.len(), 7);
        assert!(user.avatar_color.starts_with('#'));
    }

    #[test]
    fn register_rejects_duplicate_email_case_insensitively() {
        let mut store = store();
        let err = store
            .register(RegisterRequest {
                name: "Imposter".into(),
                email: "DEMO@social.app".into(),
                password: "x".into(),
            })
            .unwrap_err();

        assert_eq!(err, StoreError::EmailTaken);
        assert_eq!(store.error(), Some("An account with this email already exists."));
        assert_eq!(store.users().len(), 1);

        store.reset_error();
        assert_eq!(store.error(), None);
    }

    #[test]
    fn login_checks_password() {
        let mut store = store();
        let err = store
            .login(AuthCredentials {
                email: "demo@social.app".into(),
                password: "wrong".into(),
            })
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidCredentials);
        assert!(!store.is_authenticated());

        let user = store
            .login(AuthCredentials {
                email: "Demo@Social.app".into(),
                password: "password123".into(),
            })
            .unwrap();
        assert_eq!(user.id, DEMO_USER_ID);
        assert_eq!(store.error(), None);
    }

    #[test]
    fn register_rejects_padded_duplicate_email() {
        let mut store = store();
        let err = store
            .register(RegisterRequest {
                name: "Imposter".into(),
                email: "  demo@social.app ".into(),
                password: "x".into(),
            })
            .unwrap_err();

        assert_eq!(err, StoreError::EmailTaken);
        let matching = store
            .users()
            .iter()
            .filter(|u| u.email == "demo@social.app")
            .count();
        assert_eq!(matching, 1);
    }

    #[test]
    fn login_trims_email() {
        let mut store = store();
        register(&mut store, "Ada", "  Ada@Example.com ");
        store.logout();

        let user = store
            .login(AuthCredentials {
                email: " ada@example.com  ".into(),
                password: "hunter22".into(),
            })
            .unwrap();
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn failed_login_records_error() {
        let mut store = store();
        store
            .login(AuthCredentials {
                email: "nobody@example.com".into(),
                password: "password123".into(),
            })
            .unwrap_err();

        assert_eq!(store.error(), Some("Invalid email or password."));
    }

    #[test]
    fn stale_session_is_not_a_user() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        save_to_storage(storage.as_ref(), keys::SESSION, "user_gone");

        let mut store = AuthStore::open(storage);
        assert!(store.is_authenticated());
        assert!(store.current_user().is_none());

        store.add_friend(DEMO_USER_ID);
        store.update_profile(ProfileUpdate {
            name: Some("Ghost".into()),
            bio: None,
        });
        assert!(store.find_user(DEMO_USER_ID).unwrap().friends.is_empty());
        assert_eq!(store.users().len(), 1);
        assert!(store.friend_directory().iter().all(|e| !e.is_friend));
    }

    #[test]
    fn update_profile_signed_out_is_ignored() {
        let mut store = store();
        store.update_profile(ProfileUpdate {
            name: Some("Hacker".into()),
            bio: Some("owned".into()),
        });

        let demo = store.find_user(DEMO_USER_ID).unwrap();
        assert_eq!(demo.name, "Demo User");
        assert_ne!(demo.bio, "owned");
    }

    #[test]
    fn malformed_users_fall_back_to_seed() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set_item(keys::USERS, "[{\"id\": 42").unwrap();

        let store = AuthStore::open(storage);
        assert_eq!(store.users().len(), 1);
        assert_eq!(store.users()[0].id, DEMO_USER_ID);
    }

    #[test]
    fn session_is_persisted_and_cleared() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut store = AuthStore::open(storage.clone());
        let id = register(&mut store, "Ada", "ada@example.com");

        let reopened = AuthStore::open(storage.clone());
        assert_eq!(reopened.current_user_id(), Some(id.as_str()));
        assert_eq!(reopened.users().len(), 2);

        store.logout();
        assert_eq!(storage.get_item(keys::SESSION).unwrap(), None);
        assert!(!AuthStore::open(storage).is_authenticated());
    }

    #[test]
    fn update_profile_keeps_blank_fields() {
        let mut store = store();
        register(&mut store, "Ada", "ada@example.com");

        store.update_profile(ProfileUpdate {
            name: Some("   ".into()),
            bio: Some("  Analytical engines  ".into()),
        });

        let user = store.current_user().unwrap();
        assert_eq!(user.name, "Ada");
        assert_eq!(user.bio, "Analytical engines");
    }

    #[test]
    fn friendship_is_symmetric() {
        let mut store = store();
        let ada = register(&mut store, "Ada", "ada@example.com");

        store.add_friend(DEMO_USER_ID);
        store.add_friend(DEMO_USER_ID);
        assert_eq!(store.find_user(&ada).unwrap().friends, vec![DEMO_USER_ID.to_string()]);
        assert_eq!(store.find_user(DEMO_USER_ID).unwrap().friends, vec![ada.clone()]);

        let directory = store.friend_directory();
        assert_eq!(directory.len(), 1);
        assert!(directory[0].is_friend);

        store.remove_friend(DEMO_USER_ID);
        assert!(store.find_user(&ada).unwrap().friends.is_empty());
        assert!(store.find_user(DEMO_USER_ID).unwrap().friends.is_empty());
    }

    #[test]
    fn friend_guards() {
        let mut store = store();
        // signed out
        store.add_friend(DEMO_USER_ID);
        assert!(store.find_user(DEMO_USER_ID).unwrap().friends.is_empty());

        let ada = register(&mut store, "Ada", "ada@example.com");
        store.add_friend(&ada);
        store.add_friend("user_missing");
        assert!(store.find_user(&ada).unwrap().friends.is_empty());
    }
}
