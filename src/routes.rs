use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::{path, Filter, Rejection, Reply};

use crate::{
    auth::{with_auth_state, Auth, AuthInternal},
    error::AuthError,
    types::{Email, StoredUser, UserID, Username},
    validation::SignupForm,
};

/// `POST signup` and `POST signin`, relative to wherever the caller mounts them.
pub fn build_api_route_filter(
    auth: &Auth,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let signup = path!("signup")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_signup);

    let signin = path!("signin")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_signin);

    signup.or(signin)
}

pub async fn handle_auth_errors(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(auth_error) = err.find::<AuthError>() {
        let status = auth_error.status();
        if status.is_server_error() {
            error!(error = %auth_error, "request failed");
        } else {
            warn!(%status, error = %auth_error, "request rejected");
        }

        let body = MessageResponse {
            message: auth_error.public_message(),
        };
        return Ok(warp::reply::with_status(warp::reply::json(&body), status));
    }

    Err(err)
}

/// The `{ "message": ... }` body every route answers with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn user_signup(
    input: SignupForm,
    auth: Arc<AuthInternal>,
) -> Result<impl Reply, Rejection> {
    input
        .validate()
        .map_err(|errors| AuthError::Validation {
            message: errors.first().unwrap_or_default(),
        })?;

    let user = StoredUser {
        user_id: UserID(Uuid::new_v4().to_string()),
        username: Username(input.username),
        email: Email(input.email),
        hashed_password: auth.hash(input.password).await?,
    };

    let user_id = auth.create_user_if_not_exists(&user).await?;

    if user_id != user.user_id {
        Err(AuthError::EmailAlreadyTaken)?;
    }

    info!(user_id = %user_id.0, "registered user");

    Ok(warp::reply::json(&MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SigninResponse {
    pub message: String,
    pub token: String,
}

async fn user_signin(
    input: SigninRequest,
    auth: Arc<AuthInternal>,
) -> Result<impl Reply, Rejection> {
    let user = auth
        .retrieve_user(&Email(input.email))
        .await?
        .ok_or(AuthError::LoginFailed)?;

    if !auth
        .verify_hash(input.password, user.hashed_password.clone())
        .await?
    {
        Err(AuthError::LoginFailed)?;
    }

    let token = auth.generate_token(&user)?;

    info!(user_id = %user.user_id.0, "issued access token");

    Ok(warp::reply::json(&SigninResponse {
        message: "Signed in successfully".to_string(),
        token,
    }))
}
