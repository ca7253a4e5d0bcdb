use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use shopwise_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
use shopwise_server::{bootstrap, router, AppState};
use tower::ServiceExt;

async fn offline_app() -> Result<axum::Router, String> {
    let app = bootstrap(LoadOptions {
        overrides: ConfigOverrides {
            llm_provider: Some(LlmProvider::Offline),
            seed_demo_data: Some(true),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .await
    .map_err(|e| e.to_string())?;
    Ok(router(AppState { orchestrator: app.orchestrator, storage: app.storage }))
}

async fn send(app: axum::Router, request: Request<Body>) -> Result<(StatusCode, Value), String> {
    let response = app.oneshot(request).await.map_err(|e| e.to_string())?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.map_err(|e| e.to_string())?;
    let body = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;
    Ok((status, body))
}

#[tokio::test]
async fn offline_server_answers_health_products_and_chat() -> Result<(), String> {
    let app = offline_app().await?;

    let health = Request::builder().uri("/health").body(Body::empty()).map_err(|e| e.to_string())?;
    let (status, body) = send(app.clone(), health).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "memory");

    let products = Request::builder()
        .uri("/products?category=Electronics&limit=5")
        .body(Body::empty())
        .map_err(|e| e.to_string())?;
    let (status, body) = send(app.clone(), products).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);

    let chat = Request::builder()
        .method(Method::POST)
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "message": "show me some electronics", "customer_id": "CUST1001" }).to_string(),
        ))
        .map_err(|e| e.to_string())?;
    let (status, body) = send(app, chat).await?;
    assert_eq!(status, StatusCode::OK);
    let products = body["products"].as_array().ok_or("browsing returns products")?;
    assert!(!products.is_empty());
    assert!(body["available_coupons"].is_array());
    Ok(())
}
