use axum::{http::StatusCode, response::{IntoResponse, Response}};

use crate::rooms::RelayError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = self.0.downcast_ref::<RelayError>() {
            let status = match err {
                RelayError::RoomNotFound => StatusCode::NOT_FOUND,
                RelayError::RoomFull => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            };
            return (status, err.to_string()).into_response();
        }

        tracing::error!("{:?}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}\n\n{}", self.0, self.0.backtrace()),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
