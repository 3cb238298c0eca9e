use axum::{extract::FromRequest, Json};

use super::error::AuthError;

/// `Json` whose rejections (bad syntax, missing fields, wrong content type)
/// come back as a 400 `InvalidRequest` body like every other account error.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AuthError))]
pub struct ValidJson<T>(pub T);
