use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use chowbot_agent::BotRuntime;
use chowbot_slack::events::{
    EventContext, EventDispatcher, OutgoingWebhookPayload, SlackEnvelope, SlackEvent,
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct HttpState {
    runtime: Arc<BotRuntime>,
    dispatcher: Arc<EventDispatcher>,
    verification_token: Option<SecretString>,
}

impl HttpState {
    pub fn new(
        runtime: Arc<BotRuntime>,
        dispatcher: Arc<EventDispatcher>,
        verification_token: Option<SecretString>,
    ) -> Self {
        Self { runtime, dispatcher, verification_token }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub active_sessions: usize,
    pub checked_at: String,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/slack/receive", post(receive_outgoing_webhook))
        .with_state(state)
}

pub async fn bind(bind_address: &str, port: u16) -> std::io::Result<TcpListener> {
    let address = format!("{bind_address}:{port}");
    let listener = TcpListener::bind(&address).await?;

    info!(
        event_name = "system.http.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "http listener started"
    );
    Ok(listener)
}

pub async fn serve<F>(listener: TcpListener, state: HttpState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

async fn index() -> &'static str {
    "hi"
}

pub async fn health(State(state): State<HttpState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: "chowbot-server",
        active_sessions: state.runtime.sessions().active_count().await,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

/// Slack outgoing webhook. The reply goes out through the Web API, so the response body
/// stays empty.
pub async fn receive_outgoing_webhook(
    State(state): State<HttpState>,
    Form(payload): Form<OutgoingWebhookPayload>,
) -> StatusCode {
    if let Some(expected) = &state.verification_token {
        if payload.token.as_deref() != Some(expected.expose_secret()) {
            warn!(
                event_name = "ingress.webhook.rejected",
                channel_id = %payload.channel_id,
                "outgoing webhook token mismatch"
            );
            return StatusCode::UNAUTHORIZED;
        }
    }

    let envelope = SlackEnvelope {
        envelope_id: format!("webhook-{}", Uuid::new_v4()),
        event: SlackEvent::OutgoingWebhook(payload),
    };
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };

    info!(
        event_name = "ingress.webhook.received",
        correlation_id = %context.correlation_id,
        channel_id = envelope.event.channel_id().unwrap_or("unknown"),
        "received outgoing webhook"
    );

    if let Err(error) = state.dispatcher.dispatch(&envelope, &context).await {
        warn!(
            event_name = "ingress.webhook.dispatch_failed",
            correlation_id = %context.correlation_id,
            error = %error,
            "outgoing webhook dispatch failed"
        );
    }

    StatusCode::OK
}
