//! HTTP surface of the storefront.
//!
//! Carts are scoped by a shopper profile id carried in the path. Each profile
//! gets one in-memory session (cart store plus checkout state machine) that
//! is loaded from disk on first use.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::cart_store::CartStore;
use crate::checkout::{quote, Checkout, CheckoutError, CheckoutSource};
use crate::config::Config;
use crate::domain::aggregates::{
    CartLineItem, CheckoutForm, DeliveryAreaPatch, DeliveryZoneConfig, NewDeliveryArea, Order, OrderDefaults, Product,
    ProductFilter,
};
use crate::domain::aggregates::cart::MAX_LINE_QUANTITY;
use crate::domain::aggregates::product::{size_label_for_category, sizes_for_category};
use crate::domain::value_objects::Money;
use crate::pricing::{resolve_delivery_cost, OrderTotal, PricingRules};
use crate::storage::{
    DeliveryConfigStore, JsonFileCartStorage, JsonFileDeliveryStore, JsonFileOrderStore, JsonFileProductCatalog,
    OrderGateway, OrderGatewayError, ProductCatalog, StorageError,
};
use crate::StorefrontError;

// =============================================================================
// State
// =============================================================================

pub struct ShopperSession {
    cart: CartStore<JsonFileCartStorage>,
    checkout: Checkout,
}

impl ShopperSession {
    fn trace_events(&mut self) {
        for event in self.cart.take_events().into_iter().chain(self.checkout.take_events()) {
            event.trace();
        }
    }
}

struct SessionSlot {
    session: Arc<Mutex<ShopperSession>>,
    last_used: Instant,
}

impl SessionSlot {
    /// Only the registry holds the session: no request or submission is using it.
    fn is_unused(&self) -> bool { Arc::strong_count(&self.session) == 1 }
}

/// Lazily loaded sessions, one per shopper profile.
///
/// Carts are persisted on every change, so an evicted session is simply
/// reloaded from disk on its next request. Sessions still referenced by a
/// request or an in-flight submission are never evicted.
pub struct SessionRegistry {
    carts_dir: PathBuf,
    rules: PricingRules,
    defaults: OrderDefaults,
    max_sessions: usize,
    idle_after: Duration,
    sessions: Mutex<HashMap<String, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new(
        carts_dir: PathBuf,
        rules: PricingRules,
        defaults: OrderDefaults,
        max_sessions: usize,
        idle_after: Duration,
    ) -> Self {
        Self { carts_dir, rules, defaults, max_sessions, idle_after, sessions: Mutex::new(HashMap::new()) }
    }

    pub async fn session(&self, profile: &str) -> Result<Arc<Mutex<ShopperSession>>, StorageError> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        if let Some(slot) = sessions.get_mut(profile) {
            slot.last_used = now;
            return Ok(slot.session.clone());
        }
        let storage = JsonFileCartStorage::for_profile(&self.carts_dir, profile)?;
        if sessions.len() >= self.max_sessions {
            self.evict(&mut sessions, now);
        }
        let session = Arc::new(Mutex::new(ShopperSession {
            cart: CartStore::load(storage),
            checkout: Checkout::new(self.rules, self.defaults.clone()),
        }));
        sessions.insert(profile.to_string(), SessionSlot { session: session.clone(), last_used: now });
        tracing::debug!(%profile, "shopper session loaded");
        Ok(session)
    }

    pub async fn loaded(&self) -> usize { self.sessions.lock().await.len() }

    /// Drops idle sessions, then the least recently used unused ones until
    /// there is room for one more.
    fn evict(&self, sessions: &mut HashMap<String, SessionSlot>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, slot| !slot.is_unused() || now.duration_since(slot.last_used) < self.idle_after);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, slot)| slot.is_unused())
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(profile, _)| profile.clone());
            match oldest {
                Some(profile) => { sessions.remove(&profile); }
                None => break,
            }
        }
        tracing::debug!(evicted = before - sessions.len(), remaining = sessions.len(), "shopper sessions evicted");
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub delivery: Arc<dyn DeliveryConfigStore>,
    pub orders: Arc<dyn OrderGateway>,
    sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn ProductCatalog>,
        delivery: Arc<dyn DeliveryConfigStore>,
        orders: Arc<dyn OrderGateway>,
    ) -> Self {
        let sessions = SessionRegistry::new(
            config.carts_dir(),
            config.pricing,
            config.order_defaults.clone(),
            config.max_sessions,
            config.session_idle,
        );
        Self { config: Arc::new(config), catalog, delivery, orders, sessions: Arc::new(sessions) }
    }

    /// State wired to the JSON files under `config.data_dir`.
    pub fn from_config(config: Config) -> Self {
        let catalog = Arc::new(JsonFileProductCatalog::new(config.products_path()));
        let delivery = Arc::new(JsonFileDeliveryStore::new(config.delivery_path()));
        let orders = Arc::new(JsonFileOrderStore::new(config.orders_path()));
        Self::new(config, catalog, delivery, orders)
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub struct ApiError(StorefrontError);

impl From<StorefrontError> for ApiError {
    fn from(e: StorefrontError) -> Self { Self(e) }
}
impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self { Self(e.into()) }
}
impl From<CheckoutError> for ApiError {
    fn from(e: CheckoutError) -> Self { Self(e.into()) }
}
impl From<OrderGatewayError> for ApiError {
    fn from(e: OrderGatewayError) -> Self { Self(e.into()) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StorefrontError::ProductNotFound | StorefrontError::DeliveryAreaNotFound => StatusCode::NOT_FOUND,
            StorefrontError::Checkout(CheckoutError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            StorefrontError::Checkout(CheckoutError::EmptyCart) => StatusCode::BAD_REQUEST,
            StorefrontError::Checkout(CheckoutError::InProgress | CheckoutError::NotSubmitting) => StatusCode::CONFLICT,
            StorefrontError::Checkout(CheckoutError::Rejected(_)) | StorefrontError::Orders(_) => StatusCode::BAD_GATEWAY,
            StorefrontError::Storage(StorageError::InvalidProfile(_)) => StatusCode::BAD_REQUEST,
            StorefrontError::Storage(_) | StorefrontError::Config(_) | StorefrontError::Submission(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Router
// =============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-checkout"})) }))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/:id", get(get_product))
        .route("/api/v1/cart/:profile", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/:profile/items", post(add_item).put(update_item).delete(remove_item))
        .route("/api/v1/cart/:profile/quote", get(quote_cart))
        .route("/api/v1/delivery", get(get_delivery))
        .route("/api/v1/delivery/cost", get(delivery_cost))
        .route("/api/v1/delivery/default-cost", put(set_default_cost))
        .route("/api/v1/delivery/areas", post(add_area))
        .route("/api/v1/delivery/areas/:id", put(update_area).delete(delete_area))
        .route("/api/v1/checkout/:profile", post(checkout_cart))
        .route("/api/v1/checkout/:profile/direct", post(checkout_direct))
        .route("/api/v1/orders", get(list_orders))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discounted_price: Money,
    pub available_sizes: Vec<String>,
    pub size_label: &'static str,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let available_sizes = match (&product.sizes, &product.category) {
            (Some(sizes), _) if !sizes.is_empty() => sizes.clone(),
            (_, Some(category)) => sizes_for_category(category).iter().map(|s| s.to_string()).collect(),
            _ => vec![],
        };
        let size_label = size_label_for_category(product.category.as_deref().unwrap_or_default());
        Self { discounted_price: product.discounted_price(), available_sizes, size_label, product }
    }
}

async fn list_products(State(s): State<AppState>, Query(filter): Query<ProductFilter>) -> ApiResult<Json<Vec<ProductView>>> {
    let products = s.catalog.list_products(&filter).await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<ProductView>> {
    let product = s.catalog.get_product(&id).await?.ok_or(StorefrontError::ProductNotFound)?;
    Ok(Json(product.into()))
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLineItem>,
    pub total_items: u64,
    pub total_price: Money,
    pub formatted_total: String,
}

impl CartView {
    fn of(cart: &CartStore<JsonFileCartStorage>, symbol: &str) -> Self {
        let total_price = cart.total_price();
        Self { items: cart.items().to_vec(), total_items: cart.total_items(), total_price, formatted_total: total_price.format(symbol) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Targets one line. With `anyVariant` the first line for the product is
/// used regardless of size and color.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSelector {
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub any_variant: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(flatten)]
    pub line: LineSelector,
    pub quantity: i64,
}

async fn get_cart(State(s): State<AppState>, Path(profile): Path<String>) -> ApiResult<Json<CartView>> {
    let session = s.sessions.session(&profile).await?;
    let guard = session.lock().await;
    Ok(Json(CartView::of(&guard.cart, &s.config.currency_symbol)))
}

async fn add_item(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Json(r): Json<AddItemRequest>,
) -> ApiResult<Json<CartView>> {
    let product = s.catalog.get_product(&r.product_id).await?.ok_or(StorefrontError::ProductNotFound)?;
    let session = s.sessions.session(&profile).await?;
    let mut guard = session.lock().await;
    guard.cart.add_item(product.cart_entry(r.size, r.color));
    guard.trace_events();
    Ok(Json(CartView::of(&guard.cart, &s.config.currency_symbol)))
}

async fn update_item(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Json(r): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartView>> {
    let session = s.sessions.session(&profile).await?;
    let mut guard = session.lock().await;
    let line = &r.line;
    if line.any_variant {
        guard.cart.update_quantity(&line.product_id, r.quantity);
    } else {
        guard.cart.update_quantity_variant(&line.product_id, r.quantity, line.size.as_deref(), line.color.as_deref());
    }
    guard.trace_events();
    Ok(Json(CartView::of(&guard.cart, &s.config.currency_symbol)))
}

async fn remove_item(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Json(line): Json<LineSelector>,
) -> ApiResult<Json<CartView>> {
    let session = s.sessions.session(&profile).await?;
    let mut guard = session.lock().await;
    if line.any_variant {
        guard.cart.remove_item(&line.product_id);
    } else {
        guard.cart.remove_item_variant(&line.product_id, line.size.as_deref(), line.color.as_deref());
    }
    guard.trace_events();
    Ok(Json(CartView::of(&guard.cart, &s.config.currency_symbol)))
}

async fn clear_cart(State(s): State<AppState>, Path(profile): Path<String>) -> ApiResult<StatusCode> {
    let session = s.sessions.session(&profile).await?;
    let mut guard = session.lock().await;
    guard.cart.clear();
    guard.trace_events();
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CityParams {
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    #[serde(flatten)]
    pub totals: OrderTotal,
    pub formatted_total: String,
}

async fn quote_cart(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Query(p): Query<CityParams>,
) -> ApiResult<Json<QuoteView>> {
    let zones = s.delivery.get_delivery_config().await?;
    let session = s.sessions.session(&profile).await?;
    let guard = session.lock().await;
    let totals = quote(guard.cart.items(), &p.city, &zones, &s.config.pricing);
    Ok(Json(QuoteView { formatted_total: totals.total.format(&s.config.currency_symbol), totals }))
}

// =============================================================================
// Delivery
// =============================================================================

async fn get_delivery(State(s): State<AppState>) -> ApiResult<Json<DeliveryZoneConfig>> {
    Ok(Json(s.delivery.get_delivery_config().await?))
}

async fn delivery_cost(State(s): State<AppState>, Query(p): Query<CityParams>) -> ApiResult<Json<serde_json::Value>> {
    let zones = s.delivery.get_delivery_config().await?;
    let cost = resolve_delivery_cost(&p.city, &zones);
    Ok(Json(serde_json::json!({ "city": p.city, "cost": cost })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCostRequest {
    pub default_cost: Money,
}

async fn set_default_cost(State(s): State<AppState>, Json(r): Json<DefaultCostRequest>) -> ApiResult<Json<DeliveryZoneConfig>> {
    let mut zones = s.delivery.get_delivery_config().await?;
    zones.set_default_cost(r.default_cost);
    s.delivery.save_delivery_config(&zones).await?;
    Ok(Json(zones))
}

async fn add_area(
    State(s): State<AppState>,
    Json(r): Json<NewDeliveryArea>,
) -> ApiResult<(StatusCode, Json<DeliveryZoneConfig>)> {
    let mut zones = s.delivery.get_delivery_config().await?;
    let area = zones.add_area(r);
    tracing::info!(area_id = %area.id, name = %area.name, "delivery area added");
    s.delivery.save_delivery_config(&zones).await?;
    Ok((StatusCode::CREATED, Json(zones)))
}

async fn update_area(
    State(s): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<DeliveryAreaPatch>,
) -> ApiResult<Json<DeliveryZoneConfig>> {
    let mut zones = s.delivery.get_delivery_config().await?;
    if !zones.update_area(&id, patch) {
        return Err(StorefrontError::DeliveryAreaNotFound.into());
    }
    s.delivery.save_delivery_config(&zones).await?;
    Ok(Json(zones))
}

async fn delete_area(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<DeliveryZoneConfig>> {
    let mut zones = s.delivery.get_delivery_config().await?;
    if !zones.delete_area(&id) {
        return Err(StorefrontError::DeliveryAreaNotFound.into());
    }
    s.delivery.save_delivery_config(&zones).await?;
    Ok(Json(zones))
}

// =============================================================================
// Checkout & orders
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectCheckoutRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub form: CheckoutForm,
}

fn one() -> u32 { 1 }

async fn checkout_cart(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Json(form): Json<CheckoutForm>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    place_order(&s, &profile, CheckoutSource::Cart, form).await
}

async fn checkout_direct(
    State(s): State<AppState>,
    Path(profile): Path<String>,
    Json(r): Json<DirectCheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let product = s.catalog.get_product(&r.product_id).await?.ok_or(StorefrontError::ProductNotFound)?;
    let lines = match r.quantity {
        0 => vec![],
        quantity => vec![product.cart_entry(r.size, r.color).into_line(quantity.min(MAX_LINE_QUANTITY))],
    };
    place_order(&s, &profile, CheckoutSource::Direct(lines), r.form).await
}

/// The session lock is released while the order collaborator is called; the
/// checkout state machine rejects a second submission in the meantime. The
/// call and its completion run on their own task so a dropped request cannot
/// leave the checkout stuck in `Submitting`.
async fn place_order(
    s: &AppState,
    profile: &str,
    source: CheckoutSource,
    form: CheckoutForm,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let zones = s.delivery.get_delivery_config().await?;
    let session = s.sessions.session(profile).await?;

    let draft = {
        let mut guard = session.lock().await;
        let ShopperSession { cart, checkout } = &mut *guard;
        checkout.begin(cart, source, form, &zones)?
    };

    let orders = s.orders.clone();
    let submission = tokio::spawn(async move {
        let outcome = orders.create_order(draft).await;
        let mut guard = session.lock().await;
        let ShopperSession { cart, checkout } = &mut *guard;
        let result = checkout.complete(cart, outcome);
        guard.trace_events();
        result
    });
    let order = submission.await.map_err(StorefrontError::Submission)??;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct OrdersParams {
    pub phone: Option<String>,
}

async fn list_orders(State(s): State<AppState>, Query(p): Query<OrdersParams>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_orders(p.phone).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use crate::domain::aggregates::OrderDraft;
    use crate::storage::MockOrderGateway;

    const PRODUCTS: &str = r#"[
        {"id":"shirt","name":"Oxford Shirt","price":1500,"category":"Shirts","discount_percentage":10},
        {"id":"saree","name":"Jamdani Saree","price":4000,"category":"Sarees"}
    ]"#;

    fn config(dir: &std::path::Path) -> Config {
        Config { data_dir: dir.to_path_buf(), ..Config::default() }
    }

    fn app(dir: &std::path::Path) -> Router {
        std::fs::write(dir.join("products.json"), PRODUCTS).unwrap();
        router(AppState::from_config(config(dir)))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                request = request.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    fn shipping() -> Value {
        json!({"name": "Nusrat", "phone": "০১৭১১২২২৩৩৩", "address": "12 Lake Road", "city": "দিনাজপুর"})
    }

    #[tokio::test]
    async fn test_cart_flow_and_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        call(&app, "POST", "/api/v1/cart/guest-1/items", Some(json!({"productId": "shirt", "size": "M"}))).await;
        call(&app, "POST", "/api/v1/cart/guest-1/items", Some(json!({"productId": "shirt", "size": "M"}))).await;
        let (status, cart) = call(&app, "POST", "/api/v1/cart/guest-1/items", Some(json!({"productId": "shirt", "size": "L"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["items"].as_array().unwrap().len(), 2);
        assert_eq!(cart["totalItems"], 3);
        assert_eq!(cart["totalPrice"].as_f64(), Some(4050.0));

        let (_, quote) = call(&app, "GET", "/api/v1/cart/guest-1/quote?city=Dinajpur", None).await;
        assert_eq!(quote["deliveryWaived"], true);
        assert_eq!(quote["total"].as_f64(), Some(3240.0));

        let (status, order) = call(&app, "POST", "/api/v1/checkout/guest-1", Some(shipping())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["products"].as_array().unwrap().len(), 2);
        assert_eq!(order["status"], "pending");

        let (_, cart) = call(&app, "GET", "/api/v1/cart/guest-1", None).await;
        assert_eq!(cart["totalItems"], 0);

        let (_, orders) = call(&app, "GET", "/api/v1/orders?phone=01711222333", None).await;
        assert_eq!(orders.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_remove_lines() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "saree"}))).await;
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "S"}))).await;

        let (_, cart) = call(&app, "PUT", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "S", "quantity": 4}))).await;
        assert_eq!(cart["totalItems"], 5);

        let (_, cart) = call(&app, "PUT", "/api/v1/cart/p/items", Some(json!({"productId": "saree", "quantity": 0}))).await;
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);

        let (_, cart) = call(&app, "DELETE", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "anyVariant": true}))).await;
        assert_eq!(cart["totalItems"], 0);
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let first = app(dir.path());
        call(&first, "POST", "/api/v1/cart/p1/items", Some(json!({"productId": "saree", "color": "red"}))).await;

        let second = app(dir.path());
        let (_, cart) = call(&second, "GET", "/api/v1/cart/p1", None).await;
        assert_eq!(cart["items"][0]["color"], "red");
    }

    #[tokio::test]
    async fn test_checkout_errors() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, _) = call(&app, "POST", "/api/v1/checkout/empty", Some(shipping())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "saree"}))).await;
        let mut bad = shipping();
        bad["city"] = json!("");
        let (status, body) = call(&app, "POST", "/api/v1/checkout/p", Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("city"));

        let (status, _) = call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "nope"}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/api/v1/cart/bad%20id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    /// Rejects its first order after a delay and records later ones.
    struct SlowFirstGateway {
        calls: AtomicUsize,
        inner: JsonFileOrderStore,
    }

    #[async_trait::async_trait]
    impl OrderGateway for SlowFirstGateway {
        async fn create_order(&self, draft: OrderDraft) -> Result<Order, OrderGatewayError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(150)).await;
                return Err(OrderGatewayError::Rejected("upstream timed out".into()));
            }
            self.inner.create_order(draft).await
        }

        async fn list_orders(&self, phone: Option<String>) -> Result<Vec<Order>, OrderGatewayError> {
            self.inner.list_orders(phone).await
        }
    }

    #[tokio::test]
    async fn test_abandoned_checkout_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), PRODUCTS).unwrap();
        let cfg = config(dir.path());
        let gateway = SlowFirstGateway { calls: AtomicUsize::new(0), inner: JsonFileOrderStore::new(cfg.orders_path()) };
        let state = AppState::new(
            cfg.clone(),
            Arc::new(JsonFileProductCatalog::new(cfg.products_path())),
            Arc::new(JsonFileDeliveryStore::new(cfg.delivery_path())),
            Arc::new(gateway),
        );
        let app = router(state);
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "saree"}))).await;

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            call(&app, "POST", "/api/v1/checkout/p", Some(shipping())),
        ).await;
        assert!(abandoned.is_err());

        let (status, _) = call(&app, "POST", "/api/v1/checkout/p", Some(shipping())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let (status, _) = call(&app, "POST", "/api/v1/checkout/p", Some(shipping())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, cart) = call(&app, "GET", "/api/v1/cart/p", None).await;
        assert_eq!(cart["totalItems"], 0);
    }

    #[tokio::test]
    async fn test_registry_evicts_least_recently_used_unheld_session() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(
            dir.path().join("carts"), PricingRules::default(), OrderDefaults::default(), 2, Duration::from_secs(3600),
        );
        let held = registry.session("a").await.unwrap();
        registry.session("b").await.unwrap();
        registry.session("c").await.unwrap();
        assert_eq!(registry.loaded().await, 2);
        assert!(Arc::ptr_eq(&held, &registry.session("a").await.unwrap()));

        registry.session("d").await.unwrap();
        assert_eq!(registry.loaded().await, 2);
        assert!(Arc::ptr_eq(&held, &registry.session("a").await.unwrap()));
    }

    #[tokio::test]
    async fn test_evicted_session_reloads_its_cart() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(
            dir.path().join("carts"), PricingRules::default(), OrderDefaults::default(), 1, Duration::ZERO,
        );
        let product: Product = serde_json::from_value(json!({"id": "saree", "name": "Jamdani Saree", "price": 4000})).unwrap();
        {
            let session = registry.session("x").await.unwrap();
            session.lock().await.cart.add_item(product.cart_entry(None, Some("red".into())));
        }
        registry.session("y").await.unwrap();
        assert_eq!(registry.loaded().await, 1);

        let session = registry.session("x").await.unwrap();
        let guard = session.lock().await;
        assert_eq!(guard.cart.total_items(), 1);
        assert_eq!(guard.cart.items()[0].color.as_deref(), Some("red"));
    }

    #[tokio::test]
    async fn test_oversized_quantity_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "M"}))).await;
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "L"}))).await;
        call(&app, "PUT", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "M", "quantity": 9_999_999_999_i64}))).await;
        let (status, cart) = call(&app, "PUT", "/api/v1/cart/p/items", Some(json!({"productId": "shirt", "size": "L", "quantity": 9_999_999_999_i64}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cart["totalItems"], 2 * u64::from(MAX_LINE_QUANTITY));

        let (status, _) = call(&app, "GET", "/api/v1/cart/p", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_cart() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), PRODUCTS).unwrap();
        let mut gateway = MockOrderGateway::new();
        gateway.expect_create_order().returning(|_| Err(OrderGatewayError::Rejected("upstream down".into())));
        let cfg = config(dir.path());
        let state = AppState::new(
            cfg.clone(),
            Arc::new(JsonFileProductCatalog::new(cfg.products_path())),
            Arc::new(JsonFileDeliveryStore::new(cfg.delivery_path())),
            Arc::new(gateway),
        );
        let app = router(state);

        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "saree"}))).await;
        let (status, _) = call(&app, "POST", "/api/v1/checkout/p", Some(shipping())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (_, cart) = call(&app, "GET", "/api/v1/cart/p", None).await;
        assert_eq!(cart["totalItems"], 1);
    }

    #[tokio::test]
    async fn test_direct_checkout_leaves_cart() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        call(&app, "POST", "/api/v1/cart/p/items", Some(json!({"productId": "shirt"}))).await;

        let mut body = shipping();
        body["productId"] = json!("saree");
        body["quantity"] = json!(1);
        let (status, order) = call(&app, "POST", "/api/v1/checkout/p/direct", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["total_amount"].as_f64(), Some(3200.0));

        let (_, cart) = call(&app, "GET", "/api/v1/cart/p", None).await;
        assert_eq!(cart["totalItems"], 1);
    }

    #[tokio::test]
    async fn test_delivery_admin() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, zones) = call(&app, "POST", "/api/v1/delivery/areas", Some(json!({"name": "Rangpur", "cost": 80}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = zones["areas"][2]["id"].as_str().unwrap().to_string();

        let (_, cost) = call(&app, "GET", "/api/v1/delivery/cost?city=rangpur", None).await;
        assert_eq!(cost["cost"].as_f64(), Some(80.0));

        call(&app, "PUT", &format!("/api/v1/delivery/areas/{id}"), Some(json!({"isActive": false}))).await;
        call(&app, "PUT", "/api/v1/delivery/default-cost", Some(json!({"defaultCost": 150}))).await;
        let (_, cost) = call(&app, "GET", "/api/v1/delivery/cost?city=rangpur", None).await;
        assert_eq!(cost["cost"].as_f64(), Some(150.0));

        let (status, _) = call(&app, "DELETE", &format!("/api/v1/delivery/areas/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "DELETE", &format!("/api/v1/delivery/areas/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_product_listing() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let (_, products) = call(&app, "GET", "/api/v1/products?search=shirt", None).await;
        assert_eq!(products.as_array().unwrap().len(), 1);
        assert_eq!(products[0]["discountedPrice"].as_f64(), Some(1350.0));
        assert_eq!(products[0]["availableSizes"][0], "XS");
        assert_eq!(products[0]["sizeLabel"], "Shirt Sizes");

        let (status, _) = call(&app, "GET", "/api/v1/products/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
