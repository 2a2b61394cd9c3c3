//! Custom-Apparel Storefront - storefront core service

use anyhow::Result;
use apparel_storefront::config::Config;
use apparel_storefront::domain::aggregates::ledger::QuoteStatus;
use apparel_storefront::domain::aggregates::product::CatalogProduct;
use apparel_storefront::domain::aggregates::quote::{AddItem, Attachment, Customization, QuoteBasket};
use apparel_storefront::domain::value_objects::{ColorChoice, ReferenceId, SizeQuantities, SubmissionKind};
use apparel_storefront::router::{decode, is_reserved_segment};
use apparel_storefront::storage::JsonFileStorage;
use apparel_storefront::submission::{build_payload, ContactInfo, IntakeClient};
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{delete, get, post}, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

/// Upper bound on baskets held in memory at once. Eviction is safe because
/// every basket persists a snapshot and rehydrates on its next request.
const MAX_RESIDENT_SESSIONS: usize = 1024;

#[derive(Clone)]
struct AppState {
    baskets: Arc<Mutex<SessionBaskets>>,
    intake: Arc<IntakeClient>,
    config: Arc<Config>,
}

struct SessionEntry {
    basket: QuoteBasket,
    last_seen: u64,
}

/// Resident per-session baskets. Inserting past the cap evicts the
/// longest-idle basket first.
struct SessionBaskets {
    inner: HashMap<String, SessionEntry>,
    max_resident: usize,
    tick: u64,
}

impl SessionBaskets {
    fn new(max_resident: usize) -> Self {
        Self { inner: HashMap::new(), max_resident, tick: 0 }
    }

    fn get_or_load(&mut self, session: &str, load: impl FnOnce() -> QuoteBasket) -> &mut QuoteBasket {
        if !self.inner.contains_key(session) && self.inner.len() >= self.max_resident {
            let oldest = self
                .inner
                .iter()
                .min_by_key(|(_, e)| e.last_seen)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.inner.remove(&oldest);
                tracing::debug!(session = %oldest, "evicted longest-idle quote session");
            }
        }
        self.tick += 1;
        let entry = self
            .inner
            .entry(session.to_string())
            .or_insert_with(|| SessionEntry { basket: load(), last_seen: 0 });
        entry.last_seen = self.tick;
        &mut entry.basket
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    for group in &config.collection_groups {
        if is_reserved_segment(group) {
            tracing::warn!(group = %group, "collection group collides with a reserved view segment and will shadow it");
        }
    }

    let state = AppState {
        baskets: Arc::new(Mutex::new(SessionBaskets::new(MAX_RESIDENT_SESSIONS))),
        intake: Arc::new(IntakeClient::new(config.intake_url.clone(), config.admin_token.clone())),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "apparel-storefront"})) }))
        .route("/api/route", get(decode_route))
        .route("/api/quote/:session", get(get_quote).delete(clear_quote))
        .route("/api/quote/:session/items", post(add_item))
        .route("/api/quote/:session/items/:id", delete(remove_item))
        .route("/api/quote/:session/checkout", post(checkout))
        .route("/api/admin/quotes/:id/status", post(update_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr = format!("0.0.0.0:{}", state.config.port);
    tracing::info!("apparel-storefront listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

type ApiError = (StatusCode, String);

/// Session ids become snapshot filenames, so only a conservative character
/// set is accepted.
fn valid_session(session: &str) -> Result<&str, ApiError> {
    let ok = !session.is_empty()
        && session.len() <= 64
        && session.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(session)
    } else {
        Err((StatusCode::BAD_REQUEST, "invalid session id".to_string()))
    }
}

fn with_basket<T>(
    state: &AppState,
    session: &str,
    f: impl FnOnce(&mut QuoteBasket) -> T,
) -> Result<T, ApiError> {
    let session = valid_session(session)?;
    let mut baskets = state.baskets.lock().unwrap_or_else(|e| e.into_inner());
    let basket = baskets.get_or_load(session, || {
        let path = state.config.storage_dir.join(format!("{session}.json"));
        QuoteBasket::load(Box::new(JsonFileStorage::new(path)))
    });
    let out = f(basket);
    for event in basket.take_events() {
        tracing::debug!(session, event = ?event, "quote event");
    }
    Ok(out)
}

#[derive(Debug, Deserialize)]
struct RouteQuery {
    path: String,
}

async fn decode_route(State(s): State<AppState>, Query(q): Query<RouteQuery>) -> Json<apparel_storefront::RouteState> {
    Json(decode(&q.path, &s.config.collection_groups))
}

async fn get_quote(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    with_basket(&s, &session, |b| {
        Json(serde_json::json!({"items": b.items(), "total": b.estimated_total()}))
    })
}

#[derive(Debug, Deserialize)]
struct FilePayload { filename: String, content_type: String, data: String }

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product: CatalogProduct,
    color: ColorChoice,
    sizes: SizeQuantities,
    #[serde(default)]
    print_locations: Option<u32>,
    #[serde(default)]
    unit_price: Option<Decimal>,
    #[serde(default)]
    customizations: Vec<Customization>,
    #[serde(default)]
    logo: Option<FilePayload>,
    #[serde(default)]
    design: Option<FilePayload>,
}

fn decode_file(file: FilePayload) -> Result<Attachment, ApiError> {
    let bytes = BASE64
        .decode(file.data.as_bytes())
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, format!("invalid base64 file data: {e}")))?;
    Ok(Attachment { filename: file.filename, content_type: file.content_type, bytes })
}

async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddItemRequest>) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    // The aggregate accepts empty size maps by contract; the HTTP surface is
    // where a selection with no quantities gets rejected.
    if r.sizes.total() == 0 {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "at least one size quantity is required".to_string()));
    }
    let mut req = AddItem::new(r.product, r.color, r.sizes);
    req.print_locations = r.print_locations;
    req.unit_price = r.unit_price;
    req.customizations = r.customizations;
    req.logo = r.logo.map(decode_file).transpose()?;
    req.design = r.design.map(decode_file).transpose()?;
    let item_id = with_basket(&s, &session, |b| b.add_item(req))?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({"itemId": item_id}))))
}

async fn remove_item(State(s): State<AppState>, Path((session, item_id)): Path<(String, String)>) -> Result<StatusCode, ApiError> {
    with_basket(&s, &session, |b| b.remove_item(&item_id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_quote(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, ApiError> {
    with_basket(&s, &session, |b| b.clear())?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    contact: ContactInfo,
    #[serde(rename = "type")]
    kind: SubmissionKind,
}

async fn checkout(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<CheckoutRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    r.contact.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let (payload, submitted_ids) = with_basket(&s, &session, |b| {
        if b.is_empty() {
            None
        } else {
            let ids: Vec<String> = b
                .items()
                .iter()
                .filter(|i| i.is_renderable())
                .map(|i| i.id.clone())
                .collect();
            Some((build_payload(b.items(), r.contact.clone(), r.kind), ids))
        }
    })?
    .ok_or((StatusCode::UNPROCESSABLE_ENTITY, "quote is empty".to_string()))?;

    // The lock is not held across the network call. Only the snapshotted
    // item ids are removed after the intake confirms, so anything added to
    // the session while the call was in flight stays queued.
    let reference = s
        .intake
        .submit(&payload)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;

    with_basket(&s, &session, |b| b.complete_submission(reference.as_str(), &submitted_ids))?;
    Ok(Json(serde_json::json!({"reference": reference})))
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: QuoteStatus,
}

async fn update_status(State(s): State<AppState>, Path(id): Path<String>, Json(r): Json<StatusUpdateRequest>) -> Result<StatusCode, ApiError> {
    let reference = ReferenceId::parse(&id).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    s.intake
        .update_status(&reference, r.status)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}
