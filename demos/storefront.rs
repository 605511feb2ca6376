use std::{collections::HashMap, error::Error, sync::Arc};

use async_trait::async_trait;
use storefront_auth::{
    routes, serve, with_auth, Auth, AuthConfig, Claims, Email, ServerConfig, StoredUser,
    UserDatabase, UserID,
};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;
use warp::{path, Filter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let database_connection = Arc::new(Mutex::new(SimpleInMemoryDb::default()));

    let auth = Auth::new(AuthConfig::from_env(database_connection)?);
    let config = ServerConfig::from_env()?;

    let whoami = path!("me")
        .and(warp::get())
        .and(with_auth(&auth))
        .map(|claims: Claims| warp::reply::json(&claims));

    serve(routes(&auth, &config, whoami), config.port).await;

    Ok(())
}

#[derive(Default)]
struct SimpleInMemoryDb {
    storage: HashMap<Email, StoredUser>,
}

#[async_trait]
impl UserDatabase for SimpleInMemoryDb {
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
