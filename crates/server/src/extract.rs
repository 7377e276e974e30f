//! JSON request body extractor that reports failures as OperationOutcome

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::error::AppError;

/// Like `axum::Json`, but a body that does not deserialize becomes an
/// [`AppError`] carrying the path of the offending field.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        parse_body(&bytes).map(JsonBody)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let field = err.path().to_string();
        let inner = err.into_inner();
        match inner.classify() {
            Category::Data => AppError::Unprocessable {
                field,
                message: inner.to_string(),
            },
            Category::Syntax | Category::Eof | Category::Io => {
                AppError::BadRequest(format!("Request body is not valid JSON: {inner}"))
            }
        }
    })
}
