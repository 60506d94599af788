use axum::{
    extract::{FromRequest, Query, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;

/// `symbol` and `list_name`, from the query string or a JSON body.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WatchlistParams {
    pub symbol: String,
    pub list_name: String,
}

impl WatchlistParams {
    fn validated(self) -> Result<Self, AppError> {
        let symbol = self.symbol.trim().to_string();
        let list_name = self.list_name.trim().to_string();
        if symbol.is_empty() {
            return Err(AppError::Validation("symbol must not be empty".into()));
        }
        if list_name.is_empty() {
            return Err(AppError::Validation("list_name must not be empty".into()));
        }
        Ok(Self { symbol, list_name })
    }
}

pub struct WatchlistInput(pub WatchlistParams);

#[axum::async_trait]
impl<S> FromRequest<S> for WatchlistInput
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Ok(Query(params)) = Query::<WatchlistParams>::try_from_uri(req.uri()) {
            return Ok(Self(params.validated()?));
        }

        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));
        if !is_json {
            return Err(AppError::Validation(
                "symbol and list_name are required".into(),
            ));
        }

        let Json(params) = Json::<WatchlistParams>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(Self(params.validated()?))
    }
}
