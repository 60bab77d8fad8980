use std::{error::Error, sync::Arc, time::Duration};

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use tokio::sync::Mutex;

use crate::{
    clock::Clock,
    error::ApiError,
    types::{
        AdminID, AuthenticatedUser, Claims, CredentialRecord, HashedPassword, Identifier,
        NewCredential, Pagination, Role,
    },
};

/// Tokens stay valid for a day unless configured otherwise.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on the configured token lifetime (ten years).
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

const SALT_LENGTH: usize = 16;

#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve the credential registered under the given identifier, if any.
    /// Identifiers are expected to be unique; the first match wins.
    async fn find_credential_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<CredentialRecord>, Box<dyn Error + Send + Sync>>;

    async fn find_credential_by_id(
        &self,
        id: AdminID,
    ) -> Result<Option<CredentialRecord>, Box<dyn Error + Send + Sync>>;

    async fn list_credentials(
        &self,
        pagination: Pagination,
    ) -> Result<Vec<CredentialRecord>, Box<dyn Error + Send + Sync>>;

    /// Store a new credential and return it with its assigned id.
    async fn persist(
        &mut self,
        credential: NewCredential,
    ) -> Result<CredentialRecord, Box<dyn Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct AuthConfig {
    /// The secret used to sign JWT authorization tokens.
    /// If the key changes, all currently issued tokens stop validating.
    pub signing_key: String,
    /// How long auth tokens should remain valid for. After this interval, the client will have to re-login.
    pub token_lifetime: Duration,
    pub clock: Arc<dyn Clock>,
    pub credential_store: Arc<Mutex<dyn CredentialStore>>,
}

struct AuthInternal {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Verified against when an identifier is unknown, so that both login
    /// failure modes cost one hash verification.
    decoy_hash: HashedPassword,
}

/// Credential verification, token issue and token validation.
///
/// Cloning is cheap and every operation takes `&self`, so one instance can be
/// shared by all request handlers.
#[derive(Clone)]
pub struct Auth {
    internal: Arc<AuthInternal>,
}

impl Auth {
    /// Fails with [`ApiError::Configuration`] when no signing key is set or
    /// the token lifetime is zero or longer than [`MAX_TOKEN_LIFETIME`].
    pub fn new(config: AuthConfig) -> Result<Self, ApiError> {
        if config.signing_key.is_empty() {
            return Err(ApiError::Configuration(
                "a token signing key must be configured".into(),
            ));
        }
        if config.token_lifetime.as_secs() == 0 {
            return Err(ApiError::Configuration(
                "token lifetime must be at least one second".into(),
            ));
        }
        if config.token_lifetime > MAX_TOKEN_LIFETIME {
            return Err(ApiError::Configuration(format!(
                "token lifetime must not exceed {} seconds",
                MAX_TOKEN_LIFETIME.as_secs()
            )));
        }

        let decoy_hash = hash_password("decoy password")?;

        Ok(Self {
            internal: Arc::new(AuthInternal {
                encoding_key: EncodingKey::from_secret(config.signing_key.as_bytes()),
                decoding_key: DecodingKey::from_secret(config.signing_key.as_bytes()),
                config,
                decoy_hash,
            }),
        })
    }

    pub fn hash(&self, password: &str) -> Result<HashedPassword, ApiError> {
        hash_password(password)
    }

    pub fn verify_hash(&self, password: &str, hash: &HashedPassword) -> Result<bool, ApiError> {
        Ok(argon2::verify_encoded(&hash.0, password.as_bytes())?)
    }

    /// Check an identifier/password pair against the stored hash.
    ///
    /// Unknown identifiers and wrong passwords both yield
    /// [`ApiError::LoginFailed`].
    pub async fn verify_credentials(
        &self,
        identifier: &Identifier,
        password: &str,
    ) -> Result<CredentialRecord, ApiError> {
        let identifier = &normalize_identifier(identifier)?;

        let record = self
            .internal
            .config
            .credential_store
            .lock()
            .await
            .find_credential_by_identifier(identifier)
            .await?;

        match record {
            Some(record) if self.verify_hash(password, &record.hashed_password)? => {
                tracing::info!(identifier = %identifier.0, role = %record.role, "login succeeded");
                Ok(record)
            }
            Some(_) => {
                tracing::info!(identifier = %identifier.0, "login rejected");
                Err(ApiError::LoginFailed)
            }
            None => {
                self.verify_hash(password, &self.internal.decoy_hash)?;
                tracing::info!(identifier = %identifier.0, "login rejected");
                Err(ApiError::LoginFailed)
            }
        }
    }

    pub fn issue_token(&self, subject: &Identifier, role: Role) -> Result<String, ApiError> {
        let iat = self.internal.config.clock.now();

        let claims = Claims {
            sub: subject.0.clone(),
            email: subject.0.clone(),
            profile: role,
            role,
            iat,
            exp: iat
                .checked_add(self.internal.config.token_lifetime.as_secs())
                .ok_or_else(|| {
                    ApiError::Configuration("token expiry is out of range".into())
                })?,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.internal.encoding_key,
        )?;

        Ok(token)
    }

    /// Check the signature and expiry of a token and return the identity it carries.
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, ApiError> {
        // expiry is checked below against the configured clock
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.internal.decoding_key, &validation)?.claims;

        if claims.exp <= self.internal.config.clock.now() {
            return Err(ApiError::TokenExpired);
        }

        if claims.profile != claims.role {
            return Err(ApiError::TokenError { source: None });
        }

        Ok(AuthenticatedUser {
            subject: Identifier(claims.sub),
            role: claims.role,
        })
    }

    /// Hash the password and store a new administrator.
    pub async fn create_credential(
        &self,
        identifier: Identifier,
        password: &str,
        role: Role,
    ) -> Result<CredentialRecord, ApiError> {
        let identifier = normalize_identifier(&identifier)?;
        let hashed_password = self.hash(password)?;

        let record = self
            .internal
            .config
            .credential_store
            .lock()
            .await
            .persist(NewCredential {
                identifier,
                hashed_password,
                role,
            })
            .await?;

        tracing::info!(id = record.id.0, identifier = %record.identifier.0, role = %record.role, "administrator created");

        Ok(record)
    }

    pub async fn find_credential(&self, id: AdminID) -> Result<CredentialRecord, ApiError> {
        self.internal
            .config
            .credential_store
            .lock()
            .await
            .find_credential_by_id(id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    pub async fn list_credentials(
        &self,
        pagination: Pagination,
    ) -> Result<Vec<CredentialRecord>, ApiError> {
        Ok(self
            .internal
            .config
            .credential_store
            .lock()
            .await
            .list_credentials(pagination)
            .await?)
    }
}

// identifiers are stored and looked up without surrounding whitespace
fn normalize_identifier(identifier: &Identifier) -> Result<Identifier, ApiError> {
    let trimmed = identifier.0.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(vec!["email must not be empty".into()]));
    }

    Ok(Identifier(trimmed.to_string()))
}

fn hash_password(password: &str) -> Result<HashedPassword, ApiError> {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);

    let config = argon2::Config {
        variant: argon2::Variant::Argon2id,
        ..argon2::Config::default()
    };

    Ok(HashedPassword(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &config,
    )?))
}
