use std::sync::Arc;

use chrono::Utc;

use shopwise_agent::specialists::payment::FixedOutcome;
use shopwise_agent::{ChatInput, SalesOrchestrator, ScriptedLlmClient};
use shopwise_core::config::AgentConfig;
use shopwise_core::domain::conversation::Intent;
use shopwise_core::domain::customer::CustomerId;
use shopwise_core::domain::inventory::{FulfillmentType, StockRecord};
use shopwise_db::{DemoDataset, Storage};

async fn seeded_storage() -> Result<Storage, String> {
    let storage = Storage::in_memory();
    DemoDataset::standard(Utc::now()).load(&storage).await.map_err(|e| e.to_string())?;
    storage
        .inventory
        .save_stock(StockRecord {
            sku: "FOO1000".to_string(),
            location_id: "MUM01".to_string(),
            quantity: 20,
            reserved: 0,
        })
        .await
        .map_err(|e| e.to_string())?;
    Ok(storage)
}

#[tokio::test]
async fn greeting_cart_and_checkout_in_one_session() -> Result<(), String> {
    let storage = seeded_storage().await?;
    let llm = Arc::new(ScriptedLlmClient::new([
        r#"{"intent": "greeting"}"#,
        r#"{"intent": "cart_management"}"#,
        r#"{"intent": "checkout"}"#,
        r#"{"tool": "create_order", "arguments": {"customer_id": "CUST1002", "cart_items": [{"sku": "FOO1000", "quantity": 1}], "total_amount": 1000, "fulfillment_type": "click_and_collect", "pickup_store_id": "MUM01"}}"#,
        r#"{"reply": "Your order is confirmed for pickup at Mumbai Central!"}"#,
    ]));
    let settings = AgentConfig { max_iterations: 5, max_history: 6, recommendation_count: 5 };
    let bot = SalesOrchestrator::with_payment_outcomes(
        storage.clone(),
        llm.clone(),
        settings,
        Arc::new(FixedOutcome(true)),
    )
    .map_err(|e| e.to_string())?;

    let hello = bot
        .process_message(ChatInput::new("hi there").for_customer("CUST1002"))
        .await
        .map_err(|e| e.to_string())?;
    assert!(hello.response.starts_with("Hello Arjun!"));
    let session = hello.session_id.clone();

    let added = bot
        .process_message(ChatInput::new("add FOO1000 to my cart").in_session(&session))
        .await
        .map_err(|e| e.to_string())?;
    assert_eq!(added.intent, Intent::CartManagement);
    assert_eq!(added.cart_update.as_ref().map(|cart| cart.items.len()), Some(1));

    let checkout = bot
        .process_message(ChatInput::new("checkout please").in_session(&session))
        .await
        .map_err(|e| e.to_string())?;
    assert!(checkout.response.contains("CHECKOUT - DISCOUNT APPLIED"));
    assert!(checkout.response.ends_with("Your order is confirmed for pickup at Mumbai Central!"));
    assert!(checkout.cart_update.is_none());
    assert_eq!(llm.remaining().await, 0);

    let orders = storage
        .orders
        .list_for_customer(&CustomerId("CUST1002".to_string()), 5)
        .await
        .map_err(|e| e.to_string())?;
    assert!(orders.iter().any(|order| order.fulfillment_type == FulfillmentType::ClickAndCollect
        && order.pickup_store.as_deref() == Some("MUM01")));

    let state = bot.session(&session).await.ok_or("session stored")?;
    assert_eq!(state.messages.len(), 6);
    assert_eq!(state.interaction_count, 3);
    Ok(())
}
