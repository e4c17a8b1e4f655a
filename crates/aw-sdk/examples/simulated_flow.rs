//! Walk the full verification flow against mock host services
//! Run with: cargo run --example simulated_flow

use std::sync::Arc;

use aw_sdk::{AgeWallet, AgeWalletConfig, MemoryStore, MockBrowser, MockDeepLinks, SessionStore};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::main]
async fn main() {
    println!("🪪 AgeWallet SDK simulated verification flow\n");

    // Stand-in identity provider
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "demo-token",
            "expires_in": 60,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "age_verified": true })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let browser = Arc::new(MockBrowser::new());
    let deep_links = Arc::new(MockDeepLinks::new());

    let mut config = AgeWalletConfig::new("demo-client", "https://demo.app/callback");
    config.endpoints.token = Some(format!("{}/user/token", server.uri()));
    config.endpoints.userinfo = Some(format!("{}/user/userinfo", server.uri()));

    let wallet = AgeWallet::new(config, store.clone(), browser.clone(), deep_links.clone())
        .expect("valid configuration");

    println!("1️⃣  Checking initial status...");
    println!("   is_verified: {}\n", wallet.is_verified().await);

    println!("2️⃣  Starting verification (opens the browser)...");
    wallet.start_verification().await;
    println!("   Browser opened: {}\n", browser.opened_urls()[0]);

    println!("3️⃣  Simulating the provider redirecting back via deep link...");
    let handshake = SessionStore::new(store)
        .get_handshake()
        .await
        .expect("store readable")
        .expect("handshake persisted");
    deep_links
        .emit(&format!(
            "https://demo.app/callback?code=demo-code&state={}",
            handshake.state
        ))
        .await;

    // Give the listener task a moment to exchange the code
    for _ in 0..100 {
        if wallet.is_verified().await {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    println!("   Browser closed {} time(s)", browser.close_count());
    println!("   is_verified: {}\n", wallet.is_verified().await);

    println!("4️⃣  Clearing verification...");
    wallet.clear_verification().await;
    println!("   is_verified: {}\n", wallet.is_verified().await);

    println!("✨ Flow complete!");
}
