//! Account registry and bearer-token issuance.
//!
//! Accounts are keyed by their lower-cased email. Passwords are kept as
//! Argon2id PHC strings; issued tokens are 32 random bytes, URL-safe base64,
//! and only their digest is held in memory. Tokens are not persisted, so a
//! restart signs every session out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use taskdeck_proto::account::{LoginRequest, RegisterRequest, User, normalize_email};
use taskdeck_proto::input::ValidationError;
use taskdeck_proto::task::UserId;
use tokio::sync::RwLock;

use crate::snapshot::{self, SnapshotError};

const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 32;

/// Verified against when the email is unknown, so both failure paths pay
/// for one Argon2 verification.
static UNKNOWN_ACCOUNT_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("unknown-account", &[0u8; SALT_LEN]).unwrap_or_default());

/// Errors returned by [`AccountRegistry`] operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Registration fields were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An account with that email already exists.
    #[error("User already exists")]
    EmailTaken,

    /// Unknown email or wrong password; the two are not distinguished.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The new account could not be saved.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// Argon2 rejected its input or the hashing task died.
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// A stored account: the public user plus its Argon2id PHC string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Account {
    user: User,
    password_hash: String,
}

/// Registered accounts and live tokens.
pub struct AccountRegistry {
    accounts: RwLock<HashMap<String, Account>>,
    /// Token digest -> owner.
    tokens: RwLock<HashMap<String, UserId>>,
    snapshot_path: Option<PathBuf>,
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRegistry {
    /// Creates an empty, memory-only registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            snapshot_path: None,
        }
    }

    /// Opens a registry backed by the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if an existing snapshot cannot be read.
    pub async fn open(path: PathBuf) -> Result<Self, SnapshotError> {
        let saved: Vec<Account> = snapshot::load(&path).await?.unwrap_or_default();
        tracing::info!(path = %path.display(), count = saved.len(), "loaded account snapshot");
        let accounts = saved
            .into_iter()
            .map(|account| (account.user.email.clone(), account))
            .collect();
        Ok(Self {
            accounts: RwLock::new(accounts),
            tokens: RwLock::new(HashMap::new()),
            snapshot_path: Some(path),
        })
    }

    /// Creates an account and signs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] for bad fields,
    /// [`AccountError::EmailTaken`] for a duplicate email, or
    /// [`AccountError::Snapshot`] if the account could not be saved.
    pub async fn register(&self, request: &RegisterRequest) -> Result<(String, User), AccountError> {
        request.validate()?;
        let email = normalize_email(&request.email);
        if self.accounts.read().await.contains_key(&email) {
            return Err(AccountError::EmailTaken);
        }
        let password_hash = hash_new_password(request.password.clone()).await?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(AccountError::EmailTaken);
        }
        let user = User {
            id: UserId::new(),
            email: email.clone(),
            name: request.name.trim().to_string(),
        };
        let account = Account {
            user: user.clone(),
            password_hash,
        };
        accounts.insert(email.clone(), account);
        if let Err(e) = self.flush(&accounts).await {
            accounts.remove(&email);
            return Err(e.into());
        }
        drop(accounts);

        tracing::info!(user_id = %user.id, "account registered");
        let token = self.issue(&user.id).await;
        Ok((token, user))
    }

    /// Checks credentials and issues a fresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::InvalidCredentials`] for an unknown email or a
    /// wrong password, or [`AccountError::Hashing`] if verification could not
    /// run.
    pub async fn login(&self, request: &LoginRequest) -> Result<(String, User), AccountError> {
        let email = normalize_email(&request.email);
        let account = self.accounts.read().await.get(&email).cloned();
        let stored = account
            .as_ref()
            .map_or_else(|| UNKNOWN_ACCOUNT_HASH.clone(), |a| a.password_hash.clone());
        let verified = verify_password(request.password.clone(), stored).await?;

        let user = account.filter(|_| verified).map(|account| account.user);
        let Some(user) = user else {
            tracing::debug!("login rejected");
            return Err(AccountError::InvalidCredentials);
        };
        let token = self.issue(&user.id).await;
        Ok((token, user))
    }

    /// Resolves a bearer token to its owner.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.read().await.get(&token_digest(token)).cloned()
    }

    /// Looks up an account by id.
    pub async fn user(&self, id: &UserId) -> Option<User> {
        self.accounts
            .read()
            .await
            .values()
            .find(|account| &account.user.id == id)
            .map(|account| account.user.clone())
    }

    /// Invalidates a token. Returns whether it was live.
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens
            .write()
            .await
            .remove(&token_digest(token))
            .is_some()
    }

    async fn issue(&self, owner: &UserId) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::rng().fill(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        self.tokens
            .write()
            .await
            .insert(token_digest(&token), owner.clone());
        token
    }

    async fn flush(&self, accounts: &HashMap<String, Account>) -> Result<(), SnapshotError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let mut ordered: Vec<&Account> = accounts.values().collect();
        ordered.sort_by(|a, b| a.user.email.cmp(&b.user.email));
        snapshot::save(path, &ordered).await
    }
}

fn hash_password(password: &str, salt: &[u8]) -> Result<String, AccountError> {
    let salt = SaltString::encode_b64(salt).map_err(|e| AccountError::Hashing(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountError::Hashing(e.to_string()))
}

/// Hashes under a fresh random salt on the blocking pool.
async fn hash_new_password(password: String) -> Result<String, AccountError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    tokio::task::spawn_blocking(move || hash_password(&password, &salt))
        .await
        .map_err(|e| AccountError::Hashing(e.to_string()))?
}

/// Checks `password` against a PHC string on the blocking pool. An
/// unparsable stored hash never verifies.
async fn verify_password(password: String, stored: String) -> Result<bool, AccountError> {
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    })
    .await
    .map_err(|e| AccountError::Hashing(e.to_string()))
}

fn token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
