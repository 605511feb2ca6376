use std::{
    convert::Infallible,
    error::Error,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tokio::sync::Mutex;
use uuid::Uuid;
use warp::Filter;

use crate::{
    config,
    error::{AuthError, ConfigError},
    types::{Claims, Email, HashedPassword, StoredUser, UserID},
};

#[async_trait]
pub trait UserDatabase: Send + Sync + 'static {
    /// Store the given user and return its id. If a user with the same email already exists,
    /// return the id of that user instead and leave the store untouched.
    async fn create_user_if_not_exists(
        &mut self,
        user: &StoredUser,
    ) -> Result<UserID, Box<dyn Error + Send + Sync>>;

    /// Retrieve the user registered under the given email, if any.
    async fn retrieve_user(
        &self,
        email: &Email,
    ) -> Result<Option<StoredUser>, Box<dyn Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct AuthConfig {
    /// The secret used to sign and verify access tokens.
    /// If the secret changes, all currently issued tokens stop verifying.
    pub auth_token_secret: String,
    /// When set, issued tokens carry this issuer and presented tokens must match it.
    pub auth_token_issuer: Option<String>,
    /// How long access tokens remain valid for. Expiry is checked without leeway.
    pub auth_token_lifetime: Duration,
    /// The HMAC algorithm tokens are signed with. Anything but `HS256`, `HS384` or `HS512`
    /// cannot work with a shared secret and fails every verification as an internal error.
    pub auth_token_algorithm: Algorithm,
    pub database_connection: Arc<Mutex<dyn UserDatabase>>,
}

impl AuthConfig {
    /// Reads `JWT_SECRET` (required), `JWT_ISSUER`, `JWT_LIFETIME_SECS` (default one hour)
    /// and `JWT_ALGORITHM` (default `HS256`).
    pub fn from_env(
        database_connection: Arc<Mutex<dyn UserDatabase>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            auth_token_secret: config::required("JWT_SECRET")?,
            auth_token_issuer: config::var("JWT_ISSUER"),
            auth_token_lifetime: Duration::from_secs(config::parse_or(
                "JWT_LIFETIME_SECS",
                3600,
            )?),
            auth_token_algorithm: match config::var("JWT_ALGORITHM") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|e: jsonwebtoken::errors::Error| ConfigError::Invalid {
                        key: "JWT_ALGORITHM",
                        reason: e.to_string(),
                    })?,
                None => Algorithm::HS256,
            },
            database_connection,
        })
    }
}

pub(crate) struct AuthInternal {
    config: AuthConfig,
}

impl AuthInternal {
    /// Hash with a fresh salt on the blocking pool.
    pub async fn hash(&self, password: String) -> Result<HashedPassword, AuthError> {
        blocking(move || {
            let salt = Uuid::new_v4();
            let encoded =
                argon2::hash_encoded(password.as_bytes(), salt.as_bytes(), &Default::default())?;

            Ok(HashedPassword(encoded))
        })
        .await
    }

    pub async fn verify_hash(
        &self,
        password: String,
        hash: HashedPassword,
    ) -> Result<bool, AuthError> {
        blocking(move || Ok(argon2::verify_encoded(&hash.0, password.as_bytes())?)).await
    }

    fn algorithm(&self) -> Result<Algorithm, AuthError> {
        match self.config.auth_token_algorithm {
            algorithm @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) => Ok(algorithm),
            algorithm => Err(AuthError::Internal {
                reason: format!("{algorithm:?} cannot be used with a shared secret"),
            }),
        }
    }

    pub fn generate_token(&self, user: &StoredUser) -> Result<String, AuthError> {
        let exp = SystemTime::now() + self.config.auth_token_lifetime;

        let claims = Claims {
            sub: user.user_id.0.clone(),
            exp: exp
                .duration_since(UNIX_EPOCH)
                .map_err(|e| AuthError::Internal {
                    reason: e.to_string(),
                })?
                .as_secs(),
            iss: self.config.auth_token_issuer.clone(),
            username: Some(user.username.0.clone()),
            email: Some(user.email.0.clone()),
        };

        encode(
            &Header::new(self.algorithm()?),
            &claims,
            &EncodingKey::from_secret(self.config.auth_token_secret.as_ref()),
        )
        .map_err(|source| AuthError::TokenSigning { source })
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(self.algorithm()?);
        validation.leeway = 0;
        if let Some(issuer) = &self.config.auth_token_issuer {
            validation.set_issuer(&[issuer]);
        }

        let token = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.auth_token_secret.as_ref()),
            &validation,
        )?;

        Ok(token.claims)
    }

    /// Verify on the blocking pool so the request task only awaits the result.
    /// A verification that panics surfaces as [`AuthError::Internal`].
    pub async fn verify(self: Arc<Self>, token: String) -> Result<Claims, AuthError> {
        blocking(move || self.verify_token(&token)).await
    }

    pub async fn create_user_if_not_exists(&self, user: &StoredUser) -> Result<UserID, AuthError> {
        let user_id = self
            .config
            .database_connection
            .lock()
            .await
            .create_user_if_not_exists(user)
            .await?;

        Ok(user_id)
    }

    pub async fn retrieve_user(&self, email: &Email) -> Result<Option<StoredUser>, AuthError> {
        let user = self
            .config
            .database_connection
            .lock()
            .await
            .retrieve_user(email)
            .await?;

        Ok(user)
    }
}

/// Shared auth state. The configuration is fixed at construction and only read afterwards.
#[derive(Clone)]
pub struct Auth {
    pub(crate) internal: Arc<AuthInternal>,
}

impl Auth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            internal: Arc::new(AuthInternal { config }),
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal {
            reason: e.to_string(),
        })?
}

// functor that adds a reference to the internal auth state into the filter chain
pub(crate) fn with_auth_state(
    auth: Arc<AuthInternal>,
) -> impl Filter<Extract = (Arc<AuthInternal>,), Error = Infallible> + Clone {
    warp::any().map(move || auth.clone())
}
