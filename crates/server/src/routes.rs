//! HTTP and WebSocket surface over the sales orchestrator.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopwise_agent::{AgentError, CartUpdate, ChatInput, SalesOrchestrator};
use shopwise_core::domain::catalog::{Category, Product, ProductQuery};
use shopwise_core::domain::conversation::Channel;
use shopwise_core::domain::loyalty::Coupon;
use shopwise_core::errors::{ApplicationError, InterfaceError};
use shopwise_db::Storage;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health;

const DEFAULT_PRODUCT_LIMIT: usize = 12;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SalesOrchestrator>,
    pub storage: Storage,
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub channel: Channel,
}

impl From<ChatRequest> for ChatInput {
    fn from(request: ChatRequest) -> Self {
        Self {
            message: request.message,
            session_id: request.session_id,
            customer_id: request.customer_id,
            channel: request.channel,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_update: Option<CartUpdate>,
    pub available_coupons: Vec<Coupon>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductParams {
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub total: usize,
    pub filters: ProductFilters,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub correlation_id: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

#[derive(Debug, Default, Deserialize)]
struct SocketFrame {
    #[serde(default)]
    message: String,
    #[serde(default)]
    customer_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::health))
        .route("/products", get(list_products))
        .route("/chat", post(chat))
        .route("/ws/{session_id}", get(websocket))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Shopwise retail sales agent API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": ["/health", "/products", "/chat", "/ws/{session_id}"],
    }))
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductParams>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let correlation_id = correlation_id();
    let limit = params.limit.unwrap_or(DEFAULT_PRODUCT_LIMIT);
    let category = match params.category.as_deref().map(str::trim) {
        None | Some("") | Some("All") => None,
        Some(name) => Some(Category::from_str(name).map_err(|error| {
            api_error(ApplicationError::Domain(error).into_interface(correlation_id.clone()))
        })?),
    };

    let filters = ProductFilters {
        category: params.category,
        min_price: params.min_price,
        max_price: params.max_price,
        limit,
    };

    // limit=0 asks for nothing; the repository treats zero as unbounded
    let products = if limit == 0 {
        Vec::new()
    } else {
        let query = ProductQuery {
            category,
            min_price: params.min_price,
            max_price: params.max_price,
            limit,
        };
        state.storage.catalog.list_products(&query).await.map_err(|repository_error| {
            error!(
                event_name = "server.products.failed",
                correlation_id = %correlation_id,
                error = %repository_error,
                "product listing failed"
            );
            api_error(
                ApplicationError::Persistence(repository_error.to_string())
                    .into_interface(correlation_id.clone()),
            )
        })?
    };

    Ok(Json(ProductsResponse { total: products.len(), products, filters }))
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let correlation_id = correlation_id();
    let turn = state.orchestrator.process_message(request.into()).await.map_err(|agent_error| {
        error!(
            event_name = "server.chat.failed",
            correlation_id = %correlation_id,
            error = %agent_error,
            "chat turn failed"
        );
        api_error(application_error(&agent_error).into_interface(correlation_id.clone()))
    })?;

    Ok(Json(ChatResponse {
        response: turn.response,
        session_id: turn.session_id,
        suggestions: turn.suggestions,
        products: turn.products,
        cart_update: turn.cart_update,
        available_coupons: turn.available_coupons,
    }))
}

pub async fn websocket(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, session_id))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, session_id: String) {
    info!(event_name = "server.ws.connected", session_id = %session_id, "websocket connected");

    let connected = json!({
        "type": "connected",
        "session_id": session_id,
        "message": "Connected to the Shopwise sales agent",
    });
    if socket.send(Message::Text(connected.to_string().into())).await.is_err() {
        return;
    }

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let Some(reply) = socket_reply(&state, &session_id, text.as_str()).await else {
            continue;
        };
        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }

    info!(event_name = "server.ws.disconnected", session_id = %session_id, "websocket closed");
}

/// Builds the frame answering one incoming text frame. Blank messages get no
/// reply.
async fn socket_reply(state: &AppState, session_id: &str, text: &str) -> Option<Value> {
    let frame: SocketFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(parse_error) => {
            return Some(error_frame(format!("invalid message frame: {parse_error}")));
        }
    };
    if frame.message.trim().is_empty() {
        return None;
    }

    let input = ChatInput {
        message: frame.message,
        session_id: Some(session_id.to_string()),
        customer_id: frame.customer_id,
        channel: Channel::Web,
    };

    match state.orchestrator.process_message(input).await {
        Ok(turn) => Some(json!({
            "type": "message",
            "response": turn.response,
            "suggestions": turn.suggestions,
            "products": turn.products,
            "cart_update": turn.cart_update,
            "timestamp": Utc::now().to_rfc3339(),
        })),
        Err(agent_error) => {
            let interface = application_error(&agent_error).into_interface(correlation_id());
            warn!(
                event_name = "server.ws.turn_failed",
                session_id = %session_id,
                correlation_id = %interface.correlation_id(),
                error = %agent_error,
                "websocket turn failed"
            );
            Some(error_frame(interface.user_message().to_string()))
        }
    }
}

fn error_frame(message: String) -> Value {
    json!({ "type": "error", "message": message })
}

fn application_error(agent_error: &AgentError) -> ApplicationError {
    match agent_error {
        AgentError::Repository(source) => ApplicationError::Persistence(source.to_string()),
        AgentError::Llm(source) => ApplicationError::Integration(source.to_string()),
        AgentError::Tool(source) => ApplicationError::Integration(source.to_string()),
        AgentError::Prompt(source) => ApplicationError::Configuration(source.to_string()),
    }
}

fn api_error(interface: InterfaceError) -> ApiError {
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } | InterfaceError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let body = ErrorBody {
        detail: interface.user_message().to_string(),
        correlation_id: interface.correlation_id().to_string(),
    };
    (status, Json(body))
}

fn correlation_id() -> String {
    format!("req-{}", &Uuid::new_v4().simple().to_string()[..12])
}
