use std::sync::Arc;

use tracing::debug;
use warp::{
    http::{header::AUTHORIZATION, HeaderMap},
    Filter, Rejection,
};

use crate::{
    auth::{with_auth_state, Auth, AuthInternal},
    case_insensitive_string_ext::CaseInsensitiveStringExt,
    error::AuthError,
    types::Claims,
};

/// Guards a route with the access token carried in the `authorization` header.
///
/// The token may be sent raw or with a `Bearer ` prefix. A missing header rejects with
/// [`AuthError::MissingToken`], a token that does not verify against the configured secret
/// rejects with [`AuthError::InvalidToken`], and a failure of the verification itself rejects
/// with [`AuthError::Internal`]. Install [`crate::handle_auth_errors`] to turn these into
/// 401, 403 and 500 responses. On success the decoded [`Claims`] are extracted for the
/// downstream filter.
pub fn with_auth(auth: &Auth) -> impl Filter<Extract = (Claims,), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_auth_state(auth.internal.clone()))
        .and_then(user_auth_check)
}

// Unwrap the bearer token and validate it
async fn user_auth_check(
    headers: HeaderMap,
    auth: Arc<AuthInternal>,
) -> Result<Claims, Rejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken { source: None })?;

    let token = header
        .strip_prefix_ignore_ascii_case("bearer ")
        .unwrap_or(header)
        .trim()
        .to_string();

    let claims = auth.verify(token).await?;

    debug!(sub = %claims.sub, "verified access token");

    Ok(claims)
}
