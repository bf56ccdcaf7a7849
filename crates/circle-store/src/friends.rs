use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use circle_db::{Storage, generate_id, keys, load_from_storage, save_to_storage};
use circle_types::{FriendRequest, FriendRequestStatus};

use crate::auth::AuthStore;

pub struct FriendsStore {
    storage: Arc<dyn Storage>,
    requests: Vec<FriendRequest>,
}

impl FriendsStore {
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let requests = load_from_storage(storage.as_ref(), keys::FRIEND_REQUESTS, Vec::new());
        Self { storage, requests }
    }

    fn persist(&self) {
        save_to_storage(self.storage.as_ref(), keys::FRIEND_REQUESTS, &self.requests);
    }

    /// Ask `target_user_id` to become the signed-in user's friend. Ignored when
    /// signed out, when targeting oneself or an existing friend, or when the
    /// pair already has a pending request in either direction.
    pub fn send_request(&mut self, auth: &AuthStore, target_user_id: &str) -> Option<&FriendRequest> {
        let user = auth.current_user()?;
        if user.id == target_user_id || user.is_friend_with(target_user_id) {
            debug!("Friend request from {} to {} skipped", user.id, target_user_id);
            return None;
        }

        if self.is_pending_between(&user.id, target_user_id) {
            debug!("Friend request between {} and {} already pending", user.id, target_user_id);
            return None;
        }

        let request = FriendRequest {
            id: generate_id("friendrequest"),
            from_user_id: user.id.clone(),
            to_user_id: target_user_id.to_string(),
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
        };

        info!("Friend request {} from {} to {}", request.id, request.from_user_id, request.to_user_id);
        self.requests.push(request);
        self.persist();

        self.requests.last()
    }

    /// Accept a pending request, befriending its sender.
    pub fn accept_request(&mut self, auth: &mut AuthStore, request_id: &str) -> bool {
        let Some(request) = self.pending_mut(request_id) else {
            return false;
        };

        auth.add_friend(&request.from_user_id);
        request.status = FriendRequestStatus::Accepted;

        info!("Friend request {} accepted", request_id);
        self.persist();
        true
    }

    pub fn decline_request(&mut self, request_id: &str) -> bool {
        let Some(request) = self.pending_mut(request_id) else {
            return false;
        };

        request.status = FriendRequestStatus::Declined;

        info!("Friend request {} declined", request_id);
        self.persist();
        true
    }

    /// Drop the request outright, whatever its status.
    pub fn cancel_request(&mut self, request_id: &str) {
        self.requests.retain(|r| r.id != request_id);
        self.persist();
    }

    pub fn remove_friend(&self, auth: &mut AuthStore, user_id: &str) {
        auth.remove_friend(user_id);
    }

    fn pending_mut(&mut self, request_id: &str) -> Option<&mut FriendRequest> {
        self.requests
            .iter_mut()
            .find(|r| r.id == request_id && r.is_pending())
    }

    pub fn is_pending_between(&self, a: &str, b: &str) -> bool {
        self.requests.iter().any(|r| r.is_pending() && r.connects(a, b))
    }

    pub fn outgoing_requests(&self, auth: &AuthStore) -> Vec<&FriendRequest> {
        let Some(user) = auth.current_user() else {
            return vec![];
        };

        self.requests
            .iter()
            .filter(|r| r.from_user_id == user.id && r.is_pending())
            .collect()
    }

    pub fn incoming_requests(&self, auth: &AuthStore) -> Vec<&FriendRequest> {
        let Some(user) = auth.current_user() else {
            return vec![];
        };

        self.requests
            .iter()
            .filter(|r| r.to_user_id == user.id && r.is_pending())
            .collect()
    }

    pub fn all_requests(&self) -> &[FriendRequest] {
        &self.requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DEMO_USER_ID;
    use circle_db::MemoryStorage;
    use circle_types::{AuthCredentials, RegisterRequest};

    struct Fixture {
        auth: AuthStore,
        friends: FriendsStore,
        ada: String,
    }

    /// Ada registered (and signed in) next to the seeded demo user.
    fn fixture() -> Fixture {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut auth = AuthStore::open(storage.clone());
        let ada = auth
            .register(RegisterRequest {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                password: "hunter22".into(),
            })
            .unwrap()
            .id
            .clone();

        Fixture {
            auth,
            friends: FriendsStore::open(storage),
            ada,
        }
    }

    fn login_demo(auth: &mut AuthStore) {
        auth.login(AuthCredentials {
            email: "demo@social.app".into(),
            password: "password123".into(),
        })
        .unwrap();
    }

    #[test]
    fn pending_requests_are_deduplicated_per_pair() {
        let mut f = fixture();

        assert!(f.friends.send_request(&f.auth, DEMO_USER_ID).is_some());
        assert!(f.friends.send_request(&f.auth, DEMO_USER_ID).is_none());

        // reverse direction is the same pair
        login_demo(&mut f.auth);
        assert!(f.friends.send_request(&f.auth, &f.ada).is_none());
        assert_eq!(f.friends.all_requests().len(), 1);
        assert_eq!(f.friends.incoming_requests(&f.auth).len(), 1);
        assert!(f.friends.outgoing_requests(&f.auth).is_empty());
    }

    #[test]
    fn no_requests_to_self_or_when_signed_out() {
        let mut f = fixture();
        assert!(f.friends.send_request(&f.auth, &f.ada).is_none());

        f.auth.logout();
        assert!(f.friends.send_request(&f.auth, DEMO_USER_ID).is_none());
        assert!(f.friends.all_requests().is_empty());
    }

    #[test]
    fn accept_befriends_both_sides() {
        let mut f = fixture();
        let request_id = f.friends.send_request(&f.auth, DEMO_USER_ID).unwrap().id.clone();

        login_demo(&mut f.auth);
        assert!(f.friends.accept_request(&mut f.auth, &request_id));
        assert!(!f.friends.accept_request(&mut f.auth, &request_id));

        assert_eq!(f.friends.all_requests()[0].status, FriendRequestStatus::Accepted);
        assert!(f.auth.current_user().unwrap().is_friend_with(&f.ada));
        assert!(f.auth.find_user(&f.ada).unwrap().is_friend_with(DEMO_USER_ID));

        // friends cannot be re-requested
        assert!(f.friends.send_request(&f.auth, &f.ada).is_none());
    }

    #[test]
    fn decline_frees_the_pair_for_a_new_request() {
        let mut f = fixture();
        let request_id = f.friends.send_request(&f.auth, DEMO_USER_ID).unwrap().id.clone();

        assert!(f.friends.decline_request(&request_id));
        assert!(!f.friends.decline_request(&request_id));
        assert!(!f.friends.is_pending_between(&f.ada, DEMO_USER_ID));

        assert!(f.friends.send_request(&f.auth, DEMO_USER_ID).is_some());
        assert_eq!(f.friends.all_requests().len(), 2);
    }

    #[test]
    fn cancel_removes_regardless_of_status() {
        let mut f = fixture();
        let request_id = f.friends.send_request(&f.auth, DEMO_USER_ID).unwrap().id.clone();
        f.friends.decline_request(&request_id);

        f.friends.cancel_request(&request_id);
        assert!(f.friends.all_requests().is_empty());
    }

    #[test]
    fn remove_friend_delegates_to_auth() {
        let mut f = fixture();
        f.auth.add_friend(DEMO_USER_ID);

        f.friends.remove_friend(&mut f.auth, DEMO_USER_ID);
        assert!(!f.auth.current_user().unwrap().is_friend_with(DEMO_USER_ID));
    }

    #[test]
    fn requests_are_persisted() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let mut auth = AuthStore::open(storage.clone());
        login_demo(&mut auth);

        let mut friends = FriendsStore::open(storage.clone());
        friends.send_request(&auth, "user_someone");

        let reopened = FriendsStore::open(storage);
        assert_eq!(reopened.all_requests().len(), 1);
        assert_eq!(reopened.all_requests()[0].to_user_id, "user_someone");
    }
}
