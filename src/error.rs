use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;
use uuid::Uuid;

pub type AppResult<T> = Result<T, AppError>;

pub type ComplianceResult<T> = Result<T, ComplianceError>;

/// Coarse classification of engine failures, used for status mapping and by
/// callers that only care about the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ValidationFailed,
    PolicyViolation,
    Conflict,
    ProtectedResource,
    Internal,
}

#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("document type {0} not found")]
    TypeNotFound(Uuid),
    #[error("document field {0} not found")]
    FieldNotFound(Uuid),
    #[error("document {0} not found")]
    DocumentNotFound(Uuid),
    #[error("folder {0} not found")]
    FolderNotFound(Uuid),

    #[error("a reason is required to mark a document as not applicable")]
    ReasonRequired,
    #[error("file name and path are required")]
    FileRequired,
    #[error("expiry date is required for this document type")]
    ExpiryDateRequired,
    #[error("expiry date must not be before the issue date")]
    InvalidDateRange,
    #[error("file extension '{0}' is not allowed for this document type")]
    FileExtensionNotAllowed(String),
    #[error("file size {size} exceeds the limit of {limit} bytes")]
    FileTooLarge { size: i64, limit: i64 },
    #[error("field {0} does not belong to this document type")]
    FieldNotInType(Uuid),
    #[error("field {0} was supplied more than once")]
    DuplicateFieldValue(Uuid),
    #[error("field '{0}' is required")]
    RequiredFieldMissing(String),
    #[error("invalid value for field '{field}': {message}")]
    InvalidFieldValue { field: String, message: String },
    #[error("{0}")]
    InvalidInput(String),

    #[error("document type is inactive")]
    TypeInactive,
    #[error("document type does not allow not-applicable entries")]
    NaNotAllowed,
    #[error("only one active document is allowed for this document type")]
    SingleDocumentLimitExceeded,
    #[error("document type does not accept uploads")]
    UploadsNotAllowed,
    #[error("document type is mandatory; another active document or a not-applicable entry must remain")]
    MandatoryDocumentRequired,

    #[error("document type code '{0}' already exists")]
    DuplicateTypeCode(String),
    #[error("field name '{0}' already exists for this document type")]
    DuplicateFieldName(String),
    #[error("document type is referenced by employee documents")]
    TypeInUse,

    #[error("system document types cannot be modified this way")]
    ProtectedType,

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl ComplianceError {
    pub fn kind(&self) -> ErrorKind {
        use ComplianceError::*;

        match self {
            TypeNotFound(_) | FieldNotFound(_) | DocumentNotFound(_) | FolderNotFound(_) => {
                ErrorKind::NotFound
            }
            ReasonRequired
            | FileRequired
            | ExpiryDateRequired
            | InvalidDateRange
            | FileExtensionNotAllowed(_)
            | FileTooLarge { .. }
            | FieldNotInType(_)
            | DuplicateFieldValue(_)
            | RequiredFieldMissing(_)
            | InvalidFieldValue { .. }
            | InvalidInput(_) => ErrorKind::ValidationFailed,
            TypeInactive
            | NaNotAllowed
            | SingleDocumentLimitExceeded
            | UploadsNotAllowed
            | MandatoryDocumentRequired => ErrorKind::PolicyViolation,
            DuplicateTypeCode(_) | DuplicateFieldName(_) | TypeInUse => ErrorKind::Conflict,
            ProtectedType => ErrorKind::ProtectedResource,
            Database(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        use ComplianceError::*;

        match self {
            TypeNotFound(_) => "type_not_found",
            FieldNotFound(_) => "field_not_found",
            DocumentNotFound(_) => "document_not_found",
            FolderNotFound(_) => "folder_not_found",
            ReasonRequired => "reason_required",
            FileRequired => "file_required",
            ExpiryDateRequired => "expiry_date_required",
            InvalidDateRange => "invalid_date_range",
            FileExtensionNotAllowed(_) => "file_extension_not_allowed",
            FileTooLarge { .. } => "file_too_large",
            FieldNotInType(_) => "field_not_in_type",
            DuplicateFieldValue(_) => "duplicate_field_value",
            RequiredFieldMissing(_) => "required_field_missing",
            InvalidFieldValue { .. } => "invalid_field_value",
            InvalidInput(_) => "invalid_input",
            TypeInactive => "type_inactive",
            NaNotAllowed => "na_not_allowed",
            SingleDocumentLimitExceeded => "single_document_limit_exceeded",
            UploadsNotAllowed => "uploads_not_allowed",
            MandatoryDocumentRequired => "mandatory_document_required",
            DuplicateTypeCode(_) => "duplicate_type_code",
            DuplicateFieldName(_) => "duplicate_field_name",
            TypeInUse => "type_in_use",
            ProtectedType => "protected_type",
            Database(_) => "internal",
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            error.to_string(),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            code: self.code,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl From<validator::ValidationErrors> for ComplianceError {
    fn from(value: validator::ValidationErrors) -> Self {
        ComplianceError::InvalidInput(value.to_string())
    }
}

impl From<ComplianceError> for AppError {
    fn from(value: ComplianceError) -> Self {
        let status = match value.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::PolicyViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::ProtectedResource => StatusCode::FORBIDDEN,
            ErrorKind::Internal => {
                tracing::error!(error = %value, "compliance engine failure");
                return AppError::internal("internal server error");
            }
        };
        AppError::new(status, value.code(), value.to_string())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        AppError::from(ComplianceError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_violations_map_to_unprocessable_entity() {
        let err = AppError::from(ComplianceError::SingleDocumentLimitExceeded);
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "single_document_limit_exceeded");
    }

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (
                ComplianceError::TypeNotFound(Uuid::nil()),
                StatusCode::NOT_FOUND,
            ),
            (ComplianceError::ReasonRequired, StatusCode::BAD_REQUEST),
            (
                ComplianceError::DuplicateTypeCode("PAN".into()),
                StatusCode::CONFLICT,
            ),
            (ComplianceError::TypeInUse, StatusCode::CONFLICT),
            (ComplianceError::ProtectedType, StatusCode::FORBIDDEN),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn database_errors_hide_details() {
        let err = AppError::from(ComplianceError::Database(
            diesel::result::Error::RollbackTransaction,
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "internal server error");
    }

    #[test]
    fn classifies_every_policy_error() {
        for err in [
            ComplianceError::TypeInactive,
            ComplianceError::NaNotAllowed,
            ComplianceError::UploadsNotAllowed,
            ComplianceError::MandatoryDocumentRequired,
        ] {
            assert_eq!(err.kind(), ErrorKind::PolicyViolation);
        }
    }
}
