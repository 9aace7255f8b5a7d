//! User registration and login

use hoprun_storage::{LocalStorage, StorageResult, User};
use uuid::Uuid;

use crate::{Claims, PasswordHasher, ServiceError, ServiceResult, TokenSigner};

/// Service for user accounts and bearer tokens
pub struct AccountService {
    storage: LocalStorage,
    hasher: PasswordHasher,
    tokens: TokenSigner,
}

impl AccountService {
    pub fn new(storage: LocalStorage, tokens: TokenSigner) -> Self {
        Self {
            storage,
            hasher: PasswordHasher::default(),
            tokens,
        }
    }

    /// Override the PBKDF2 work factor for new hashes
    pub fn with_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Register a user. A taken email fails with [`ServiceError::Conflict`].
    #[tracing::instrument(skip_all)]
    pub async fn register(&self, email: &str, password: &str) -> ServiceResult<User> {
        let email = email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::Validation(
                "email must be a valid address".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(ServiceError::Validation("password must not be empty".to_string()));
        }

        let hasher = self.hasher;
        let password = password.to_string();
        let user = self
            .storage
            .run(move |storage| -> ServiceResult<User> {
                let hash = hasher.hash(&password)?;
                Ok(storage.create_user(&email, &hash)?)
            })
            .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown emails and wrong passwords fail the same way and both run one
    /// full password derivation.
    #[tracing::instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<String> {
        let email = email.trim().to_string();
        let hasher = self.hasher;
        let password = password.to_string();

        let user_id: Option<Uuid> = self
            .storage
            .run(move |storage| -> StorageResult<Option<Uuid>> {
                let Some(user) = storage.find_user_by_email(&email)? else {
                    // Same derivation cost as a wrong password
                    hasher.verify(&password, &hasher.placeholder_hash());
                    return Ok(None);
                };
                Ok(hasher
                    .verify(&password, &user.password_hash)
                    .then_some(user.id))
            })
            .await?;

        let Some(user_id) = user_id else {
            tracing::info!("login rejected");
            return Err(ServiceError::Unauthorized("bad credentials".to_string()));
        };

        tracing::info!(user_id = %user_id, "user logged in");
        self.tokens.issue(user_id)
    }

    /// Verify a bearer token and return its claims
    pub fn validate_token(&self, token: &str) -> ServiceResult<Claims> {
        self.tokens.verify(token)
    }

    /// Whether the user behind a token still exists
    pub async fn user_exists(&self, user_id: Uuid) -> ServiceResult<bool> {
        let user = self
            .storage
            .run(move |storage| storage.get_user(user_id))
            .await?;
        Ok(user.is_some())
    }
}
