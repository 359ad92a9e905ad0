//! In-memory login gate for one interactive session.
//!
//! Identities live only as long as the [`SessionGate`] value; nothing is
//! persisted. Failed calls leave the gate exactly as they found it.

use std::collections::HashMap;

use tracing::{debug, info};

/// Identity present in every freshly seeded session.
pub const SEEDED_IDENTITY: &str = "test_user@example.com";
pub const SEEDED_SECRET: &str = "password123";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect password. Please try again.")]
    WrongSecret,

    #[error("Email not found. Please sign up first or check for typos.")]
    UnknownIdentity,

    #[error("Email already exists. Please choose a different one.")]
    AlreadyExists,

    #[error("Email and password cannot be empty.")]
    EmptyField,

    #[error("Not logged in.")]
    NotAuthenticated,
}

/// Registered identities plus the current login state.
#[derive(Debug, Clone, Default)]
pub struct SessionGate {
    identities: HashMap<String, String>,
    authenticated: bool,
    current: Option<String>,
}

impl SessionGate {
    /// A gate with no registered identities.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A gate holding the single seeded identity, as every session starts.
    pub fn seeded() -> Self {
        let mut gate = Self::empty();
        gate.identities
            .insert(SEEDED_IDENTITY.to_string(), SEEDED_SECRET.to_string());
        gate
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn current_identity(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Check `secret` against the registered identity and log in on a match.
    pub fn login(&mut self, identity: &str, secret: &str) -> Result<(), AuthError> {
        let (identity, secret) = (identity.trim(), secret.trim());
        let stored = self
            .identities
            .get(identity)
            .ok_or(AuthError::UnknownIdentity)?;
        if stored != secret {
            debug!("login rejected: wrong secret");
            return Err(AuthError::WrongSecret);
        }

        self.authenticated = true;
        self.current = Some(identity.to_string());
        info!(identity, "logged in");
        Ok(())
    }

    /// Register a new identity. Does not log in.
    pub fn signup(&mut self, identity: &str, secret: &str) -> Result<(), AuthError> {
        let (identity, secret) = (identity.trim(), secret.trim());
        if self.identities.contains_key(identity) {
            return Err(AuthError::AlreadyExists);
        }
        if identity.is_empty() || secret.is_empty() {
            return Err(AuthError::EmptyField);
        }

        self.identities
            .insert(identity.to_string(), secret.to_string());
        info!(identity, "identity registered");
        Ok(())
    }

    pub fn logout(&mut self) {
        if let Some(identity) = self.current.take() {
            info!(identity = %identity, "logged out");
        }
        self.authenticated = false;
    }

    /// The logged-in identity, or [`AuthError::NotAuthenticated`].
    pub fn require_authenticated(&self) -> Result<&str, AuthError> {
        match (self.authenticated, self.current.as_deref()) {
            (true, Some(identity)) => Ok(identity),
            _ => Err(AuthError::NotAuthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_identity_can_log_in() {
        let mut gate = SessionGate::seeded();
        assert!(!gate.is_authenticated());
        assert_eq!(gate.require_authenticated(), Err(AuthError::NotAuthenticated));

        gate.login(SEEDED_IDENTITY, SEEDED_SECRET).expect("login");
        assert!(gate.is_authenticated());
        assert_eq!(gate.current_identity(), Some(SEEDED_IDENTITY));
        assert_eq!(gate.require_authenticated(), Ok(SEEDED_IDENTITY));
    }

    #[test]
    fn wrong_secret_leaves_gate_unauthenticated() {
        let mut gate = SessionGate::empty();
        gate.signup("a@x.com", "pw").unwrap();

        assert_eq!(gate.login("a@x.com", "wrong"), Err(AuthError::WrongSecret));
        assert!(!gate.is_authenticated());
        assert_eq!(gate.current_identity(), None);
    }

    #[test]
    fn unknown_identity_is_rejected() {
        let mut gate = SessionGate::seeded();
        assert_eq!(
            gate.login("nobody@x.com", "password123"),
            Err(AuthError::UnknownIdentity)
        );
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn signup_twice_keeps_first_secret() {
        let mut gate = SessionGate::empty();
        gate.signup("a@x.com", "pw").unwrap();
        assert_eq!(gate.signup("a@x.com", "other"), Err(AuthError::AlreadyExists));

        assert_eq!(gate.login("a@x.com", "other"), Err(AuthError::WrongSecret));
        gate.login("a@x.com", "pw").expect("original secret still valid");
    }

    #[test]
    fn signup_does_not_log_in() {
        let mut gate = SessionGate::empty();
        gate.signup("a@x.com", "pw").unwrap();
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn signup_rejects_blank_fields() {
        let mut gate = SessionGate::empty();
        assert_eq!(gate.signup("", "pw"), Err(AuthError::EmptyField));
        assert_eq!(gate.signup("a@x.com", "   "), Err(AuthError::EmptyField));
        assert_eq!(gate.login("a@x.com", ""), Err(AuthError::UnknownIdentity));
    }

    #[test]
    fn existing_identity_wins_over_blank_secret() {
        let mut gate = SessionGate::seeded();
        assert_eq!(gate.signup(SEEDED_IDENTITY, ""), Err(AuthError::AlreadyExists));
    }

    #[test]
    fn inputs_are_trimmed() {
        let mut gate = SessionGate::empty();
        gate.signup("  a@x.com ", " pw ").unwrap();
        gate.login("a@x.com", "pw").expect("trimmed credentials match");
        assert_eq!(gate.current_identity(), Some("a@x.com"));
    }

    #[test]
    fn logout_clears_identity() {
        let mut gate = SessionGate::seeded();
        gate.login(SEEDED_IDENTITY, SEEDED_SECRET).unwrap();
        gate.logout();
        assert!(!gate.is_authenticated());
        assert_eq!(gate.current_identity(), None);
        assert!(gate.require_authenticated().is_err());
    }
}
