use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::response::{ApiError, empty};
use crate::broker::{Bridge, SimpleMessage, SimpleSubscription, Status};

type ApiResult = Result<Json<Value>, ApiError>;

pub fn router(bridge: Arc<Bridge>) -> Router {
    Router::new()
        .route("/message", post(send_message).get(last_message))
        .route(
            "/subscription",
            post(add_subscription).delete(remove_subscription_body),
        )
        .route("/subscription/:name", delete(remove_subscription))
        .route("/status", get(status).delete(reset_status))
        .with_state(bridge)
}

pub async fn serve(addr: &str, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router).await
}

async fn send_message(
    State(bridge): State<Arc<Bridge>>,
    Json(message): Json<SimpleMessage>,
) -> ApiResult {
    bridge.send(&message).await.map_err(|e| {
        error!(topic = %message.topic, error = %e, "Failed to send message");
        ApiError(e)
    })?;
    Ok(empty())
}

async fn last_message(State(bridge): State<Arc<Bridge>>) -> Response {
    match bridge.last_message() {
        Some(message) => Json(message).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn add_subscription(
    State(bridge): State<Arc<Bridge>>,
    Json(body): Json<SimpleSubscription>,
) -> ApiResult {
    bridge
        .add_subscription(&body.subscription)
        .await
        .map_err(|e| {
            error!(topic = %body.subscription, error = %e, "Failed to subscribe");
            ApiError(e)
        })?;
    Ok(empty())
}

async fn remove_subscription(
    State(bridge): State<Arc<Bridge>>,
    Path(name): Path<String>,
) -> ApiResult {
    unsubscribe(&bridge, &name).await
}

// older clients send the topic in the body
async fn remove_subscription_body(
    State(bridge): State<Arc<Bridge>>,
    Json(body): Json<SimpleSubscription>,
) -> ApiResult {
    unsubscribe(&bridge, &body.subscription).await
}

async fn unsubscribe(bridge: &Bridge, topic: &str) -> ApiResult {
    bridge.remove_subscription(topic).await.map_err(|e| {
        error!(topic = %topic, error = %e, "Failed to unsubscribe");
        ApiError(e)
    })?;
    Ok(empty())
}

async fn status(State(bridge): State<Arc<Bridge>>) -> Json<Status> {
    Json(bridge.status())
}

async fn reset_status(State(bridge): State<Arc<Bridge>>) -> Json<Value> {
    bridge.reset();
    empty()
}
