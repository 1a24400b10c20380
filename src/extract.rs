use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_path_to_error::{Path, Segment};
use validator::Validate;

use crate::error::{AppError, FieldError};

/// JSON body extractor that names the offending field on type errors and
/// runs the shape's validation rules before the handler sees it.
pub struct ValidJson<T>(pub T);

impl<T> ValidJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> FromRequest for ValidJson<T>
where
    T: DeserializeOwned + Validate + 'static,
{
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Bytes::from_request(req, payload);
        Box::pin(async move {
            let bytes = body.await?;
            let value: T = parse_body(&bytes)?;
            value.validate().map_err(AppError::from)?;
            Ok(ValidJson(value))
        })
    }
}

/// Deserializes a JSON body, mapping data errors to the field they occurred in.
pub fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut de).map_err(|err| {
        let parent = field_path(err.path());
        let inner = err.into_inner();
        let message = inner.to_string();
        if !inner.is_data() {
            return AppError::Payload(message);
        }
        let (field, code) = match missing_field(&message) {
            Some(name) if parent.is_empty() => (name.to_string(), "missing"),
            Some(name) => (format!("{}.{}", parent, name), "missing"),
            None => (parent, "type"),
        };
        if field.is_empty() {
            return AppError::Payload(message);
        }
        AppError::Validation(vec![FieldError {
            field,
            code: code.to_string(),
            message,
        }])
    })?;
    de.end().map_err(|e| AppError::Payload(e.to_string()))?;
    Ok(value)
}

fn field_path(path: &Path) -> String {
    path.iter()
        .filter_map(|segment| match segment {
            Segment::Map { key } => Some(key.clone()),
            Segment::Seq { index } => Some(index.to_string()),
            Segment::Enum { variant } => Some(variant.clone()),
            Segment::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
}
