//! Thin authentication layer: an in-memory user store, bearer-token
//! sessions, and the idempotent admin bootstrap.
//!
//! This is a collaborator of the distribution core, not part of it. The
//! core only requires that an `AuthContext` exists on protected requests.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::AdminCredentials;

/// Already-validated caller identity attached to authenticated requests.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
struct User {
    id: Uuid,
    password: String,
}

/// Users keyed by email plus active session tokens.
#[derive(Debug, Default)]
pub struct AuthService {
    users: RwLock<HashMap<String, User>>,
    sessions: RwLock<HashMap<Uuid, Uuid>>,
}

impl AuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the user if it does not exist yet. Returns true when a user
    /// was created. Re-running with the same email changes nothing.
    pub async fn ensure_user(&self, email: &str, password: &str) -> bool {
        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return false;
        }
        users.insert(
            email.to_string(),
            User {
                id: Uuid::new_v4(),
                password: password.to_string(),
            },
        );
        true
    }

    /// Validate credentials and issue a session token.
    pub async fn login(&self, email: &str, password: &str) -> Option<Uuid> {
        let users = self.users.read().await;
        let user = users.get(email)?;
        if user.password != password {
            return None;
        }
        let token = Uuid::new_v4();
        self.sessions.write().await.insert(token, user.id);
        Some(token)
    }

    /// Resolve a bearer token to the caller's identity.
    pub async fn authenticate(&self, token: &str) -> Option<AuthContext> {
        let token = Uuid::parse_str(token).ok()?;
        let sessions = self.sessions.read().await;
        sessions.get(&token).map(|&user_id| AuthContext { user_id })
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

/// Explicit bootstrap step executed at startup, before the server accepts
/// requests. Credentials come from configuration; there is no built-in
/// default account. Idempotent: an existing admin is left untouched.
pub async fn bootstrap_admin(auth: &AuthService, admin: Option<&AdminCredentials>) {
    match admin {
        Some(creds) => {
            if auth.ensure_user(&creds.email, &creds.password).await {
                tracing::info!(email = %creds.email, "Bootstrapped administrator account");
            } else {
                tracing::debug!(email = %creds.email, "Administrator account already present");
            }
        }
        None => {
            tracing::warn!(
                "No administrator configured ({} / {} unset); login is disabled until one is provisioned",
                AdminCredentials::EMAIL_VAR,
                AdminCredentials::PASSWORD_VAR
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminCredentials {
        AdminCredentials {
            email: "admin@example.com".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let auth = AuthService::new();
        let creds = admin();
        bootstrap_admin(&auth, Some(&creds)).await;
        bootstrap_admin(&auth, Some(&creds)).await;
        assert_eq!(auth.user_count().await, 1);
    }

    #[tokio::test]
    async fn login_issues_distinct_tokens() {
        let auth = AuthService::new();
        bootstrap_admin(&auth, Some(&admin())).await;

        let t1 = auth.login("admin@example.com", "s3cret").await.unwrap();
        let t2 = auth.login("admin@example.com", "s3cret").await.unwrap();
        assert_ne!(t1, t2);

        let ctx1 = auth.authenticate(&t1.to_string()).await.unwrap();
        let ctx2 = auth.authenticate(&t2.to_string()).await.unwrap();
        assert_eq!(ctx1.user_id, ctx2.user_id);
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        let auth = AuthService::new();
        bootstrap_admin(&auth, Some(&admin())).await;

        assert!(auth.login("admin@example.com", "wrong").await.is_none());
        assert!(auth.login("nobody@example.com", "s3cret").await.is_none());
        assert!(auth.authenticate("not-a-token").await.is_none());
        assert!(auth.authenticate(&Uuid::new_v4().to_string()).await.is_none());
    }

    #[tokio::test]
    async fn bootstrap_without_credentials_creates_no_users() {
        let auth = AuthService::new();
        bootstrap_admin(&auth, None).await;
        assert_eq!(auth.user_count().await, 0);
    }
}
