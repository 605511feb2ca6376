#![allow(dead_code)]

use std::{
    collections::HashMap,
    error::Error,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use storefront_auth::{Auth, AuthConfig, Claims, Email, StoredUser, UserDatabase, UserID};
use tokio::sync::Mutex;

pub const SECRET: &str = "this is a really bad secret";

#[derive(Default)]
pub struct TestDB {
    storage: HashMap<Email, StoredUser>,
}

#[async_trait]
impl UserDatabase for TestDB {
    async fn create_user_if_not_exists(
        &mut self,
        user: &StoredUser,
    ) -> Result<UserID, Box<dyn Error + Send + Sync>> {
        let stored = self
            .storage
            .entry(user.email.clone())
            .or_insert_with(|| user.clone());

        Ok(stored.user_id.clone())
    }

    async fn retrieve_user(
        &self,
        email: &Email,
    ) -> Result<Option<StoredUser>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(email).cloned())
    }
}

pub fn auth() -> Auth {
    auth_with_algorithm(Algorithm::HS256)
}

pub fn auth_with_algorithm(algorithm: Algorithm) -> Auth {
    Auth::new(AuthConfig {
        auth_token_secret: SECRET.into(),
        auth_token_issuer: None,
        auth_token_lifetime: Duration::from_secs(60 * 60),
        auth_token_algorithm: algorithm,
        database_connection: Arc::new(Mutex::new(TestDB::default())),
    })
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub fn token(secret: &str, sub: &str, exp: u64) -> String {
    let claims = Claims {
        sub: sub.into(),
        exp,
        iss: None,
        username: Some("bob123".into()),
        email: Some("bob@x.com".into()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
