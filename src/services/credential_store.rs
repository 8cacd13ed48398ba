//! Identity store used by the login flow.

use std::collections::HashMap;

use subtle::ConstantTimeEq;

use crate::models::identity::{Credentials, Identity};

/// Authoritative source of credential-to-identity mappings.
///
/// The token service only needs one question answered: do these
/// credentials belong to someone, and if so, who.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credentials: &Credentials) -> Option<Identity>;
}

/// In-memory allow-list of users.
#[derive(Default)]
pub struct StaticCredentialStore {
    users: HashMap<String, (String, Identity)>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the two demo accounts: `admin/admin` and `test/test`.
    pub fn demo() -> Self {
        Self::new()
            .with_user("admin", "admin", "CloudWeGo", "Hertz")
            .with_user("test", "test", "CloudWeGo", "Hertz")
    }

    /// Add a user, replacing any existing entry with the same username.
    pub fn with_user(
        mut self,
        username: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Self {
        let identity = Identity {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        self.users
            .insert(username.to_string(), (password.to_string(), identity));
        self
    }
}

impl CredentialVerifier for StaticCredentialStore {
    fn verify(&self, credentials: &Credentials) -> Option<Identity> {
        let (password, identity) = self.users.get(&credentials.username)?;

        // Constant-time comparison so response timing does not leak the password
        let matches: bool = password
            .as_bytes()
            .ct_eq(credentials.password.as_bytes())
            .into();

        matches.then(|| identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_users_resolve_to_full_identities() {
        let store = StaticCredentialStore::demo();

        let admin = store.verify(&Credentials::new("admin", "admin")).unwrap();
        assert_eq!(admin.username, "admin");
        assert_eq!(admin.first_name, "CloudWeGo");
        assert_eq!(admin.last_name, "Hertz");

        let test = store.verify(&Credentials::new("test", "test")).unwrap();
        assert_eq!(test.username, "test");
        assert_eq!(test.first_name, "CloudWeGo");
        assert_eq!(test.last_name, "Hertz");
    }

    #[test]
    fn wrong_password_or_unknown_user_is_rejected() {
        let store = StaticCredentialStore::demo();
        assert!(store.verify(&Credentials::new("admin", "test")).is_none());
        assert!(store.verify(&Credentials::new("admin", "admin2")).is_none());
        assert!(store.verify(&Credentials::new("nobody", "admin")).is_none());
    }
}
