//! Registration and login checks over the credential store

use bcrypt::{hash, verify};
use tracing::info;

use crate::db::UserStore;
use crate::error::AuthError;
use crate::models::{Credentials, User};

/// Shortest password accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Symbols a password may contain, at least one of which is required
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

const EMPTY_USERNAME: &str = "Username cannot be empty";
const WEAK_PASSWORD: &str = "Password must contain at least 8 characters, one uppercase letter, \
     one lowercase letter, one number, and one special character";

/// Password complexity rules
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub symbols: String,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            symbols: PASSWORD_SYMBOLS.to_owned(),
        }
    }
}

impl PasswordPolicy {
    /// Whether `password` satisfies the policy.
    ///
    /// Only ASCII letters, digits and the policy symbols are allowed, and each of the four
    /// classes has to appear at least once.
    pub fn accepts(&self, password: &str) -> bool {
        let is_symbol = |c: char| self.symbols.contains(c);

        password.chars().count() >= self.min_length
            && password
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || is_symbol(c))
            && password.chars().any(|c| c.is_ascii_lowercase())
            && password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_digit())
            && password.chars().any(is_symbol)
    }
}

impl Credentials {
    /// Checks the registration shape, collecting every violated rule
    pub fn validate(&self, policy: &PasswordPolicy) -> Result<(), AuthError> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push(EMPTY_USERNAME.to_owned());
        }
        if !policy.accepts(&self.password) {
            errors.push(WEAK_PASSWORD.to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AuthError::InvalidInput(errors))
        }
    }
}

/// Credential verifier
pub struct Accounts {
    store: UserStore,
    policy: PasswordPolicy,
    cost: u32,
}

impl Accounts {
    pub fn new(store: UserStore, policy: PasswordPolicy, cost: u32) -> Self {
        Self {
            store,
            policy,
            cost,
        }
    }

    /// Validates and stores a new credential record with a salted bcrypt hash
    pub async fn register(&self, credentials: &Credentials) -> Result<(), AuthError> {
        credentials.validate(&self.policy)?;

        if self.store.find(&credentials.username).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let user = User {
            username: credentials.username.clone(),
            password_hash: hash(&credentials.password, self.cost)?,
        };

        if !self.store.insert(&user).await? {
            // Lost a race with a concurrent registration
            return Err(AuthError::AlreadyExists);
        }

        info!(username = %user.username, "User registered");
        Ok(())
    }

    /// Checks the password against the stored hash, returning the authenticated username
    ///
    /// Credentials of an invalid shape are rejected before the lookup.
    pub async fn verify(&self, credentials: &Credentials) -> Result<String, AuthError> {
        credentials.validate(&self.policy)?;

        let user = self
            .store
            .find(&credentials.username)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !verify(&credentials.password, &user.password_hash)? {
            return Err(AuthError::BadPassword);
        }

        Ok(user.username)
    }
}
