use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::Deserialize;
use std::sync::Arc;

use super::error::{ApiError, ApiResult};
use crate::app::App;
use crate::feed::FeedSnapshot;
use crate::storage::Subscription;

/// `?url=` query parameter; absent means empty.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AddFeedRequest {
    #[serde(default)]
    pub url: String,
}

/// `POST /feeds` body: JSON when the request says so, a urlencoded form
/// otherwise.
#[derive(Debug)]
pub struct AddFeedBody(pub AddFeedRequest);

impl<S> FromRequest<S> for AddFeedBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<AddFeedRequest>::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e.body_text())))?;
            return Ok(Self(body));
        }

        let Form(body) = Form::<AddFeedRequest>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid form body: {}", e.body_text())))?;
        Ok(Self(body))
    }
}

fn require_url(url: &str) -> ApiResult<&str> {
    if url.is_empty() {
        return Err(ApiError::bad_request("URL parameter is required"));
    }
    Ok(url)
}

/// `GET /feeds`
pub async fn list_feeds(State(app): State<Arc<App>>) -> Json<Vec<Subscription>> {
    Json(app.list_subscriptions())
}

/// `POST /feeds` with either a JSON body `{"url": ...}` or a form field `url`.
pub async fn add_feed(
    State(app): State<Arc<App>>,
    AddFeedBody(body): AddFeedBody,
) -> ApiResult<(StatusCode, Json<Subscription>)> {
    let url = require_url(&body.url)?;
    let subscription = app.add_subscription(url).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// `GET /feed?url=`
pub async fn get_feed(
    State(app): State<Arc<App>>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<FeedSnapshot>> {
    let url = require_url(&query.url)?;
    Ok(Json(app.get_subscription_content(url).await?))
}

/// `DELETE /feed?url=`
pub async fn remove_feed(
    State(app): State<Arc<App>>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<StatusCode> {
    let url = require_url(&query.url)?;
    app.remove_subscription(url)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /export?url=`
pub async fn export_feed(
    State(app): State<Arc<App>>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Response> {
    let url = require_url(&query.url)?;
    let rss = app.export_as_feed(url).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        rss,
    )
        .into_response())
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
