use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rally_catalog::RegistryError;
use rally_core::CoreError;
use rally_session::{EditError, RosterError, ServiceError};
use rally_store::backup::BackupError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            },
            AppError::Anyhow(err) => match err.downcast_ref::<ServiceError>() {
                Some(service_error) => service_status(service_error),
                None => {
                    tracing::error!("Internal Server Error: {}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}

fn service_status(err: &ServiceError) -> (StatusCode, String) {
    let status = match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Roster(e) => match e {
            RosterError::EmptyName => StatusCode::BAD_REQUEST,
            RosterError::Forbidden(_) => StatusCode::FORBIDDEN,
            RosterError::DuplicateName(_)
            | RosterError::SessionCompleted(_)
            | RosterError::InvalidTransition { .. } => StatusCode::CONFLICT,
        },
        ServiceError::Edit(e) => match e {
            EditError::Forbidden => StatusCode::FORBIDDEN,
            EditError::SessionCompleted(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        },
        ServiceError::Draft(_) => StatusCode::BAD_REQUEST,
        ServiceError::Registry(e) => match e {
            RegistryError::DuplicateName(_) => StatusCode::CONFLICT,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        },
        ServiceError::Backup(e) => match e {
            BackupError::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            BackupError::Store(core) => core_status(core),
            _ => StatusCode::BAD_REQUEST,
        },
        ServiceError::Store(core) => core_status(core),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }
    (status, err.to_string())
}

fn core_status(err: &CoreError) -> StatusCode {
    match err {
        CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
        CoreError::NotFoundError(_) => StatusCode::NOT_FOUND,
        CoreError::IdentityError(_) => StatusCode::UNAUTHORIZED,
        CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoreError::StorageError(_) | CoreError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
