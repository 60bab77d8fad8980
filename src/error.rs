use warp::reject::Reject;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("email or password incorrect")]
    LoginFailed,
    #[error("no bearer token supplied")]
    MissingToken,
    #[error("error with token")]
    TokenError {
        #[source]
        source: Option<jsonwebtoken::errors::Error>,
    },
    #[error("token has expired")]
    TokenExpired,
    #[error("role {0} may not access this resource")]
    Forbidden(crate::types::Role),
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("resource not found")]
    NotFound,
    #[error("error during database operation")]
    DatabaseError {
        #[from]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("error while hashing password")]
    HashError {
        #[from]
        source: argon2::Error,
    },
}

impl ApiError {
    /// True for failures that should be reported as "not authenticated".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            ApiError::LoginFailed
                | ApiError::MissingToken
                | ApiError::TokenError { .. }
                | ApiError::TokenExpired
        )
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(source: jsonwebtoken::errors::Error) -> Self {
        match source.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::TokenError {
                source: Some(source),
            },
        }
    }
}

impl Reject for ApiError {}
