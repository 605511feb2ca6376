use jsonwebtoken::errors::ErrorKind;
use warp::{hyper::StatusCode, reject::Reject};

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken {
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },
    #[error("token verification failed: {reason}")]
    Internal { reason: String },
    #[error("{message}")]
    Validation { message: &'static str },
    #[error("User with this email already exists")]
    EmailAlreadyTaken,
    #[error("Invalid email or password")]
    LoginFailed,
    #[error("error during database operation")]
    DatabaseError {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("error hashing password")]
    Hashing {
        #[from]
        source: argon2::Error,
    },
    #[error("error signing token")]
    TokenSigning {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken { .. } | AuthError::LoginFailed => StatusCode::FORBIDDEN,
            AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyTaken => StatusCode::CONFLICT,
            AuthError::Internal { .. }
            | AuthError::DatabaseError { .. }
            | AuthError::Hashing { .. }
            | AuthError::TokenSigning { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client. Server-side failures never leak their cause.
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::ExpiredSignature
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::InvalidToken { source: Some(err) },
            _ => AuthError::Internal {
                reason: err.to_string(),
            },
        }
    }
}

impl Reject for AuthError {}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {key} is not set")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("signup request failed")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
