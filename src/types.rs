use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct UserID(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Username(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Email(pub String);

#[derive(Debug, Clone, Deserialize, Serialize)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

/// A user record as handed to and returned from a [`crate::UserDatabase`].
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserID,
    pub username: Username,
    pub email: Email,
    pub hashed_password: HashedPassword,
}

/// The identity decoded from a verified access token.
///
/// Handed to downstream filters by [`crate::with_auth`] and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
