use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use campus_social::{ErrorKind, SocialError};
use campus_types::api::MessageResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid or rejected credentials
    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error(transparent)]
    Social(#[from] SocialError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Social(e) => match e.kind() {
                ErrorKind::InvalidInput
                | ErrorKind::InvalidState
                | ErrorKind::Precondition
                | ErrorKind::InvalidOperation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::ServerFault => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Social(SocialError::Server(cause)) = &self {
            error!("Request failed: {:?}", cause);
        }

        (self.status(), Json(MessageResponse::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_statuses() {
        let cases = [
            (SocialError::InvalidInput("x"), StatusCode::BAD_REQUEST),
            (SocialError::NotFound("User"), StatusCode::NOT_FOUND),
            (SocialError::AlreadyExists("x"), StatusCode::CONFLICT),
            (SocialError::Unauthorized("x"), StatusCode::FORBIDDEN),
            (SocialError::Server(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::Unauthenticated("x").status(), StatusCode::UNAUTHORIZED);
    }
}
