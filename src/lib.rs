//! Form relay HTTP API for the Retroznak landing page
//!
//! Validates contact, product-inquiry and history-inquiry submissions
//! server-side, renders an HTML notification email and relays it to a fixed
//! recipient list. The canonical validation rule set is also exported as
//! JSON so the browser runs the same schema it is checked against here.

pub mod config;
pub mod email;
pub mod error;
pub mod mailer;
pub mod net;
pub mod types;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tracing::info;

use config::Config;
use email::SystemInfo;
use error::FormError;
use mailer::MailTransport;
use types::{ApiResponse, HealthResponse, RawSubmission};
use validation::RuleSet;

const MAX_BODY_BYTES: usize = 256 * 1024;

const MSG_SUBMITTED: &str =
    "Заявка успешно отправлена. Мы свяжемся с вами в ближайшее время.";

// ==================== App State ====================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rules: Arc<RuleSet>,
    pub transport: Arc<dyn MailTransport>,
}

impl AppState {
    pub fn new(config: Config, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            config: Arc::new(config),
            rules: Arc::new(RuleSet::standard()),
            transport,
        }
    }
}

// ==================== Router ====================

pub fn app(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route(
            "/api/submit-form",
            post(submit_form).fallback(invalid_method),
        )
        .route("/api/validation-rules", get(validation_rules))
        .route("/health", get(health))
        .fallback_service(ServeDir::new(static_dir))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ==================== Handlers ====================

/// GET /health - liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/validation-rules - canonical rule schema for the browser evaluator
async fn validation_rules(State(state): State<AppState>) -> Json<RuleSet> {
    Json((*state.rules).clone())
}

/// Any non-POST on the submit endpoint: generic failure, no details.
async fn invalid_method() -> Response {
    FormError::InvalidMethod.into_response()
}

/// POST /api/submit-form - validate, render the email, deliver, respond
async fn submit_form(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let info = SystemInfo::from_request(request.headers(), peer.ip());

    // Single result boundary: any internal failure becomes the generic
    // internal-error response and never leaks details.
    match handle_submission(&state, &info, request).await {
        Ok(response) => {
            info!(client_ip = %info.client_ip, "submission relayed");
            (axum::http::StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn handle_submission(
    state: &AppState,
    info: &SystemInfo,
    request: Request,
) -> Result<ApiResponse, FormError> {
    let raw = read_submission(request).await?;
    let form = validation::validate_submission(&state.rules, &raw)
        .map_err(FormError::Validation)?;

    let payload = email::render(&form, info, &state.config);
    if mailer::deliver_all(
        state.transport.as_ref(),
        &state.config.recipient_emails,
        &payload,
    )
    .await
    {
        Ok(ApiResponse::success(MSG_SUBMITTED))
    } else {
        Err(FormError::Delivery)
    }
}

// ==================== Body Decoding ====================

/// Decode a submission body: browsers send `FormData` as multipart, plain
/// form posts arrive URL-encoded.
async fn read_submission(request: Request) -> Result<RawSubmission, FormError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        read_multipart(request).await
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| FormError::Internal(format!("failed to read body: {e}")))?;
        Ok(parse_urlencoded(&bytes))
    }
}

async fn read_multipart(request: Request) -> Result<RawSubmission, FormError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| FormError::Internal(format!("invalid multipart body: {e}")))?;

    let mut raw = RawSubmission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FormError::Internal(format!("invalid multipart field: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| FormError::Internal(format!("invalid multipart value: {e}")))?;
        raw.insert(&name, value);
    }
    Ok(raw)
}

fn parse_urlencoded(body: &[u8]) -> RawSubmission {
    let mut raw = RawSubmission::default();
    let text = String::from_utf8_lossy(body);
    for pair in text.split('&').filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        raw.insert(&decode_component(name), decode_component(value));
    }
    raw
}

fn decode_component(component: &str) -> String {
    let with_spaces = component.replace('+', " ");
    urlencoding::decode(&with_spaces)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(with_spaces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_body_decodes_plus_and_percent_sequences() {
        let raw = parse_urlencoded("name=%D0%90%D0%BD%D0%BD%D0%B0+%D0%98%D0%B2%D0%B0%D0%BD%D0%BE%D0%B2%D0%B0&email=a%40b.ru".as_bytes());
        assert_eq!(raw.field("name"), Some("Анна Иванова"));
        assert_eq!(raw.field("email"), Some("a@b.ru"));
    }

    #[test]
    fn repeated_option_fields_accumulate() {
        let raw = parse_urlencoded(
            b"additional_options%5B%5D=led_lighting&additional_options%5B%5D=street_plate",
        );
        assert_eq!(raw.additional_options(), ["led_lighting", "street_plate"]);
    }

    #[test]
    fn malformed_pairs_do_not_panic() {
        let raw = parse_urlencoded(b"&==&name=ok&%ZZ=1");
        assert_eq!(raw.field("name"), Some("ok"));
    }
}
