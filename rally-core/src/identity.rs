use rally_shared::Masked;
use serde::{Deserialize, Serialize};

/// What a signed-in user may do. Admins have unrestricted edits; members can
/// only join and ask to leave.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

pub trait CredentialVerifier: Send + Sync {
    /// Role for a matching login/password pair, `None` otherwise.
    fn verify(&self, login: &str, password: &str) -> Option<Role>;
}

/// Fixed admin and member credentials taken from configuration.
pub struct StaticCredentials {
    admin_login: String,
    admin_password: Masked<String>,
    member_login: String,
    member_password: Masked<String>,
}

impl StaticCredentials {
    pub fn new(
        admin_login: impl Into<String>,
        admin_password: Masked<String>,
        member_login: impl Into<String>,
        member_password: Masked<String>,
    ) -> Self {
        Self {
            admin_login: admin_login.into(),
            admin_password,
            member_login: member_login.into(),
            member_password,
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, login: &str, password: &str) -> Option<Role> {
        let login = login.trim();
        if login == self.admin_login && password == self.admin_password.expose().as_str() {
            tracing::info!("Admin signed in");
            Some(Role::Admin)
        } else if login == self.member_login && password == self.member_password.expose().as_str() {
            tracing::info!("Member signed in");
            Some(Role::Member)
        } else {
            tracing::warn!("Rejected sign-in attempt for '{}'", login);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> StaticCredentials {
        StaticCredentials::new(
            "admin",
            Masked::new("admin123".to_string()),
            "user",
            Masked::new("user123".to_string()),
        )
    }

    #[test]
    fn test_roles_resolve() {
        let v = verifier();
        assert_eq!(v.verify("admin", "admin123"), Some(Role::Admin));
        assert_eq!(v.verify(" user ", "user123"), Some(Role::Member));
        assert_eq!(v.verify("admin", "user123"), None);
        assert!(Role::Admin.is_admin());
        assert!(!Role::Member.is_admin());
    }
}
