//! Requests through the real router and middleware stack.
//!
//! The pool is lazy and never connects, so these cover only paths that
//! finish before touching the database: role gating, empty carts and
//! rendering pages for a fresh visitor.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::middleware::from_fn;
use serde_json::Value;
use tower::ServiceExt;

use tienda_integration_tests::lazy_state;
use tienda_storefront::middleware::{
    create_session_layer, csp_nonce_middleware, security_headers_middleware,
};
use tienda_storefront::routes;

fn app() -> Router {
    let state = lazy_state();
    let sessions = create_session_layer(state.pool(), state.config());
    routes::routes()
        .layer(sessions)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(csp_nonce_middleware))
        .with_state(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::ACCEPT, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

// =============================================================================
// Back-office gating
// =============================================================================

#[tokio::test]
async fn test_admin_pages_redirect_anonymous_visitors_to_login() {
    for uri in [
        "/admin/products",
        "/admin/tags",
        "/admin/orders",
        "/admin/employees",
    ] {
        let response = app().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login"
        );
    }
}

#[tokio::test]
async fn test_admin_mutations_require_login() {
    let cases = [
        ("/admin/products", r#"{"name":"Tee","base_price":"100"}"#),
        ("/admin/products/1/active", r#"{"active":false}"#),
        ("/admin/products/1/tags", r#"{"tag_ids":[1,2]}"#),
        ("/admin/products/1/sizes", r#"{"sizes":["M"]}"#),
        ("/admin/categories", r#"{"name":"Style"}"#),
        ("/admin/tags", r#"{"category_id":1,"name":"Retro"}"#),
        ("/admin/orders/1/status", r#"{"status":"confirmed"}"#),
        (
            "/admin/employees",
            r#"{"email":"e@tiendaplayeras.mx","display_name":"E","password":"x"}"#,
        ),
    ];

    for (uri, body) in cases {
        let response = app().oneshot(post_json(uri, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "Please log in");
    }
}

// =============================================================================
// Shopper flows without a cart
// =============================================================================

#[tokio::test]
async fn test_checkout_with_no_cart_is_rejected() {
    let response = app()
        .oneshot(post_form("/checkout", "shipping_address="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"], "Your cart is empty");
}

#[tokio::test]
async fn test_cancelling_someone_elses_order_is_not_found() {
    let response = app()
        .oneshot(post_form("/orders/42/cancel", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["ok"], false);
}

#[tokio::test]
async fn test_empty_cart_page_renders_with_nonce() {
    let response = app().oneshot(get("/cart")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let csp = response
        .headers()
        .get(header::CONTENT_SECURITY_POLICY)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();
    let nonce = csp
        .split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap()
        .to_owned();

    let html = body_text(response).await;
    assert!(html.contains("Your cart is empty"));
    assert!(html.contains(&format!("nonce=\"{nonce}\"")));
    assert!(html.contains("data-cart-count>0<"));
}

#[tokio::test]
async fn test_order_history_is_empty_for_new_visitors() {
    let response = app().oneshot(get("/orders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("You haven't placed any orders yet."));
}

#[tokio::test]
async fn test_login_page_renders_error_message() {
    let response = app()
        .oneshot(get("/auth/login?error=credentials"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Invalid email or password."));
}
