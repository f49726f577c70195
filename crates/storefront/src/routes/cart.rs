//! Cart and checkout handlers.
//!
//! Mutations take form posts. Clients sending `Accept: application/json`
//! (the cart script) get `{ok, ...}` envelopes; plain form posts are
//! redirected back to the cart page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tienda_core::{CartLineId, CurrencyCode};

use super::{Layout, format_money, wants_json};
use crate::error::{ApiError, ApiResult, AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::models::cart::{Cart, CartLine};
use crate::services::cart::{AddToCart, CartSummary};
use crate::services::checkout::{CheckoutError, ShippingPolicy};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub size: &'static str,
    pub quantity: i32,
    pub image_url: Option<String>,
    pub price: String,
    pub line_price: String,
}

impl CartItemView {
    fn new(line: &CartLine, currency: CurrencyCode) -> Self {
        Self {
            id: line.id.as_i32(),
            slug: line.product_slug.clone(),
            name: line.product_name.clone(),
            size: line.size.as_str(),
            quantity: line.quantity,
            image_url: line.image_url.clone(),
            price: format_money(currency, line.unit_price),
            line_price: format_money(currency, line.line_total()),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: i64,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub free_shipping: bool,
}

impl CartView {
    fn new(cart: &Cart, policy: &ShippingPolicy, currency: CurrencyCode) -> Self {
        let totals = policy.totals(cart);
        Self {
            items: cart
                .lines
                .iter()
                .map(|line| CartItemView::new(line, currency))
                .collect(),
            item_count: cart.item_count(),
            subtotal: format_money(currency, totals.subtotal),
            shipping: format_money(currency, totals.shipping),
            total: format_money(currency, totals.total),
            free_shipping: totals.shipping.is_zero(),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub free_shipping_from: String,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: i32,
    pub quantity: i32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: i32,
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub shipping_address: Option<String>,
}

/// `{ok, count}`.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub ok: bool,
    pub count: i64,
}

/// `{ok, count, subtotal}`.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub ok: bool,
    pub count: i64,
    pub subtotal: String,
}

impl SummaryResponse {
    fn new(summary: CartSummary, currency: CurrencyCode) -> Self {
        Self {
            ok: true,
            count: summary.count,
            subtotal: format_money(currency, summary.subtotal),
        }
    }
}

/// `{ok, order_id, ticket, redirect}` for a placed order.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub ok: bool,
    pub order_id: i32,
    pub ticket: String,
    pub redirect: String,
}

/// JSON body for API clients, redirect back to the cart for plain forms.
fn json_or_cart<T: Serialize>(headers: &HeaderMap, body: T) -> Response {
    if wants_json(headers) {
        Json(body).into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Display the cart page.
#[instrument(skip(state, shopper, nonce))]
pub async fn show(
    State(state): State<AppState>,
    shopper: Shopper,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let cart = match shopper.owner().await? {
        Some(owner) => state.cart().cart(&owner).await?,
        None => Cart::default(),
    };
    let shop = &state.config().shop;

    Ok(CartShowTemplate {
        layout: Layout::build(&state, &shopper, nonce).await?,
        cart: CartView::new(&cart, &ShippingPolicy::from(shop), shop.currency),
        free_shipping_from: format_money(shop.currency, shop.free_shipping_threshold),
    })
}

/// Add a product in a size to the cart.
#[instrument(skip(state, shopper, headers))]
pub async fn add(
    State(state): State<AppState>,
    shopper: Shopper,
    headers: HeaderMap,
    Form(form): Form<AddToCart>,
) -> ApiResult<Response> {
    let owner = shopper.owner_or_create().await?;
    let count = state.cart().add(&owner, &form).await?;

    let product_id = form.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", &product_id), ("size", &form.size)]),
    );

    Ok(json_or_cart(&headers, CountResponse { ok: true, count }))
}

/// Change a line's quantity; zero removes it.
#[instrument(skip(state, shopper, headers))]
pub async fn update(
    State(state): State<AppState>,
    shopper: Shopper,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> ApiResult<Response> {
    let owner = shopper
        .owner()
        .await?
        .ok_or_else(|| AppError::NotFound("Cart line not found".to_string()))?;

    let summary = state
        .cart()
        .update(&owner, CartLineId::new(form.line_id), form.quantity)
        .await?;

    Ok(json_or_cart(
        &headers,
        SummaryResponse::new(summary, state.config().shop.currency),
    ))
}

/// Remove a line.
#[instrument(skip(state, shopper, headers))]
pub async fn remove(
    State(state): State<AppState>,
    shopper: Shopper,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> ApiResult<Response> {
    let owner = shopper
        .owner()
        .await?
        .ok_or_else(|| AppError::NotFound("Cart line not found".to_string()))?;

    let summary = state
        .cart()
        .remove(&owner, CartLineId::new(form.line_id))
        .await?;

    Ok(json_or_cart(
        &headers,
        SummaryResponse::new(summary, state.config().shop.currency),
    ))
}

/// Units in the visitor's cart.
#[instrument(skip(state, shopper))]
pub async fn count(
    State(state): State<AppState>,
    shopper: Shopper,
) -> ApiResult<Json<CountResponse>> {
    let count = match shopper.owner().await? {
        Some(owner) => state.cart().count(&owner).await?,
        None => 0,
    };
    Ok(Json(CountResponse { ok: true, count }))
}

/// Place an order from the cart, empty the cart and show the ticket.
#[instrument(skip(state, shopper, headers, form))]
pub async fn checkout(
    State(state): State<AppState>,
    shopper: Shopper,
    headers: HeaderMap,
    Form(form): Form<CheckoutForm>,
) -> ApiResult<Response> {
    let json = wants_json(&headers);

    let Some(owner) = shopper.owner().await? else {
        return empty_cart(json);
    };

    let cart = state.cart().cart(&owner).await?;
    let detail = match state
        .checkout()
        .place_order(owner, &cart, form.shipping_address.as_deref())
        .await
    {
        Ok(detail) => detail,
        Err(CheckoutError::EmptyCart) => return empty_cart(json),
        Err(e) => return Err(ApiError::from(e)),
    };

    let cleared = state.cart().clear_ordered(&owner, &cart).await?;
    tracing::debug!(cleared, "Cart cleared after checkout");

    let order = &detail.order;
    let redirect = format!("/orders/{}", order.id);
    if json {
        return Ok(Json(CheckoutResponse {
            ok: true,
            order_id: order.id.as_i32(),
            ticket: order.ticket_code(),
            redirect,
        })
        .into_response());
    }
    Ok(Redirect::to(&redirect).into_response())
}

fn empty_cart(json: bool) -> ApiResult<Response> {
    if json {
        return Err(ApiError::from(CheckoutError::EmptyCart));
    }
    Ok(Redirect::to("/cart").into_response())
}
