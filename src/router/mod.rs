//! HTTP surface of the bridge.

pub mod directory;
pub mod login;
pub mod status;

use axum::Json;
use axum::extract::{FromRequest, Request};
use validator::Validate;

use crate::error::ServerError;

/// JSON body extractor running the payload's validation rules.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}
