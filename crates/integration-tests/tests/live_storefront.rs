//! Flows against a running storefront with a migrated, seeded database.
//!
//! Requires:
//! - `tienda-cli migrate` and `tienda-cli seed catalog -f <file>` with at
//!   least one active product offered in size M
//! - The storefront running (`cargo run -p tienda-storefront`)
//!
//! Run with: `cargo test -p tienda-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode, redirect};
use serde_json::Value;

use tienda_integration_tests::live_base_url;

/// A client that keeps its session cookie and does not follow redirects.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// First product id on the catalog page, scraped from the add-to-cart form.
async fn first_product_id(client: &Client) -> String {
    let base_url = live_base_url();
    let listing = client
        .get(format!("{base_url}/products?sort=id_asc"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let slug = listing
        .split("href=\"/products/")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .expect("catalog has at least one product")
        .to_owned();

    let detail = client
        .get(format!("{base_url}/products/{slug}"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    detail
        .split("name=\"product_id\" value=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .expect("product page has an add-to-cart form")
        .to_owned()
}

async fn add(client: &Client, product_id: &str, quantity: &str) -> Value {
    client
        .post(format!("{}/cart/add", live_base_url()))
        .header("Accept", "application/json")
        .form(&[("product_id", product_id), ("size", "M"), ("quantity", quantity)])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded database"]
async fn test_repeated_adds_merge_into_one_line() {
    let client = client();
    let product_id = first_product_id(&client).await;

    let first = add(&client, &product_id, "2").await;
    assert_eq!(first["ok"], true);
    assert_eq!(first["count"], 2);

    let second = add(&client, &product_id, "3").await;
    assert_eq!(second["count"], 5);

    let cart = client
        .get(format!("{}/cart", live_base_url()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(cart.matches("name=\"line_id\"").count(), 2, "one line, two forms");
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded database"]
async fn test_checkout_creates_ticket_and_clears_cart() {
    let client = client();
    let base_url = live_base_url();
    let product_id = first_product_id(&client).await;
    add(&client, &product_id, "1").await;

    let placed: Value = client
        .post(format!("{base_url}/checkout"))
        .header("Accept", "application/json")
        .form(&[("shipping_address", "Calle 5 #12, Guadalajara")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(placed["ok"], true);
    let redirect_to = placed["redirect"].as_str().unwrap();

    let ticket = client
        .get(format!("{base_url}{redirect_to}"))
        .send()
        .await
        .unwrap();
    assert_eq!(ticket.status(), StatusCode::OK);
    assert!(ticket.text().await.unwrap().contains("Calle 5 #12, Guadalajara"));

    let count: Value = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 0);

    let cancelled: Value = client
        .post(format!("{base_url}/orders/{}/cancel", placed["order_id"]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cancelled["status"], "cancelled");
}

#[tokio::test]
#[ignore = "Requires running storefront and seeded database"]
async fn test_unknown_size_is_a_validation_error() {
    let client = client();
    let product_id = first_product_id(&client).await;

    let response = client
        .post(format!("{}/cart/add", live_base_url()))
        .header("Accept", "application/json")
        .form(&[("product_id", product_id.as_str()), ("size", "XXXL")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["ok"], false);
    assert!(json["errors"]["size"].is_string());
}
