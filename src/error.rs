use actix_web::{error::BlockingError, http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::db::StoreError;
use crate::routes::RouteDoc;

// Field groups that are flattened into their parent on the wire.
const FLATTENED_GROUPS: &[&str] = &["identity", "profile", "credentials"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("request validation failed")]
    Validation(Vec<FieldError>),

    #[error("malformed request body: {0}")]
    Payload(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("blocking task failed: {0}")]
    Blocking(#[from] BlockingError),

    #[error("{} {} ({}) is not implemented yet", .0.method, .0.path, .0.summary)]
    NotImplemented(&'static RouteDoc),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: String,
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [FieldError],
}

fn no_fields(fields: &&[FieldError]) -> bool {
    fields.is_empty()
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors(&errors, &mut Vec::new(), &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

fn collect_field_errors(
    errors: &ValidationErrors,
    path: &mut Vec<String>,
    out: &mut Vec<FieldError>,
) {
    for (name, kind) in errors.errors() {
        let flattened = FLATTENED_GROUPS.contains(name);
        if !flattened {
            path.push((*name).to_string());
        }
        match kind {
            ValidationErrorsKind::Field(list) => {
                let field = path.join(".");
                for err in list {
                    out.push(FieldError {
                        field: field.clone(),
                        code: err.code.to_string(),
                        message: err
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| describe(&err.code, &err.params)),
                    });
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, path, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    path.push(index.to_string());
                    collect_field_errors(inner, path, out);
                    path.pop();
                }
            }
        }
        if !flattened {
            path.pop();
        }
    }
}

fn describe(
    code: &str,
    params: &std::collections::HashMap<std::borrow::Cow<'static, str>, serde_json::Value>,
) -> String {
    match code {
        "length" => match (params.get("min"), params.get("max")) {
            (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
            (Some(min), None) => format!("length must be at least {}", min),
            (None, Some(max)) => format!("length must be at most {}", max),
            (None, None) => "invalid length".to_string(),
        },
        other => format!("failed {} check", other),
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Payload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Store(_) | AppError::PasswordHash(_) | AppError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Server-side details (store paths, io errors) stay in the log.
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let fields = match self {
            AppError::Validation(fields) => fields.as_slice(),
            _ => &[][..],
        };
        HttpResponse::build(status).json(ErrorBody { detail, fields })
    }
}
