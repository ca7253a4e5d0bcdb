//! Conversation orchestration: one user turn in, one assistant turn out.
//!
//! Each turn loads the session's [`ConversationState`], classifies the
//! message, dispatches to exactly one node of a fixed routing table and stores
//! the updated state. Nodes never fail the turn: a node error is logged and
//! replaced by that node's fallback reply.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shopwise_core::commerce::checkout::CheckoutSummary;
use shopwise_core::commerce::loyalty::{format_inr, format_inr_whole};
use shopwise_core::commerce::recommend::Preferences;
use shopwise_core::config::AgentConfig;
use shopwise_core::domain::catalog::{Product, ProductQuery};
use shopwise_core::domain::conversation::{
    CartItem, Channel, ChatMessage, ChatRole, ConversationState, Intent, StoredMessage,
};
use shopwise_core::domain::customer::{CustomerId, CustomerProfile};
use shopwise_core::domain::loyalty::{Coupon, DiscountType};
use shopwise_core::domain::order::OrderId;
use shopwise_db::Storage;

use crate::errors::AgentError;
use crate::intent::{
    extract_order_id, extract_quantity, extract_skus, match_product, mentioned_categories_in,
    parse_cart_command, CartCommand, KeywordIntentClassifier, PreferenceExtractor,
};
use crate::llm::{complete_json, LlmClient, LlmRequest};
use crate::prompts::PromptLibrary;
use crate::specialists::fulfillment::{self, AddressArgs, CartLine, CreateOrderArgs, FulfillmentTools};
use crate::specialists::inventory::{self, AvailabilityArgs, InventoryTools};
use crate::specialists::loyalty::{self, CheckoutArgs, LoyaltyTools};
use crate::specialists::payment::{self, PaymentOutcomeSource, PaymentTools, RandomOutcome};
use crate::specialists::post_purchase::{self, PostPurchaseTools};
use crate::specialists::recommendation::{
    self, products_from_output, PreferenceArgs, RecommendArgs, RecommendationTools,
};
use crate::specialists::SpecialistAgent;
use crate::tools::ToolRegistry;

const GUEST: &str = "guest";
const TABLE_ROWS: usize = 10;
const DEFAULT_SESSION_IDLE_HOURS: i64 = 24;

const RECOMMEND_FALLBACK: &str =
    "I'm having trouble finding products. Could you tell me what you're looking for?";
const INVENTORY_FALLBACK: &str = "I can help check stock! Provide a SKU or category.";
const CART_FALLBACK: &str = "I couldn't update your cart just now. Please try again.";
const PAYMENT_FALLBACK: &str = "Ready for checkout! Confirm your cart and payment method.";
const FULFILL_FALLBACK: &str = "Order created! You'll receive confirmation soon.";
const SUPPORT_FALLBACK: &str =
    "I can help with order tracking, returns and support tickets. Could you share your order ID?";
const FAREWELL: &str = "Thank you for shopping! 😊 I'm always here if you need anything.";
const EMPTY_CART: &str = "Your cart is empty. Let me help you find something!";
const EMPTY_CART_CHECKOUT: &str =
    "Your cart is empty, so there's nothing to check out yet. Tell me what you're looking for!";
const PAYMENT_METHODS: &str = "**💳 Payment Methods:**\n• Credit/Debit Card\n• UPI\n• Net Banking\n• Cash on Delivery\n\nWhich would you prefer?";

/// One incoming chat message.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ChatInput {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub channel: Channel,
}

impl ChatInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), ..Self::default() }
    }

    pub fn in_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn for_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartUpdate {
    pub items: Vec<CartItem>,
    pub total: Decimal,
}

/// The assistant's side of a turn.
#[derive(Clone, Debug, Serialize)]
pub struct ChatTurn {
    pub response: String,
    pub session_id: String,
    pub intent: Intent,
    pub suggestions: Vec<String>,
    /// Products surfaced by this turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_update: Option<CartUpdate>,
    pub available_coupons: Vec<Coupon>,
}

/// Session states kept in process memory, keyed by session id.
///
/// Sessions idle for longer than the idle window are dropped on the next
/// save. A turn loads, mutates and saves its state without holding the lock,
/// so two overlapping turns on one session (HTTP and WebSocket) keep only the
/// later save.
pub struct InMemoryCheckpointer {
    sessions: Mutex<HashMap<String, ConversationState>>,
    idle_ttl: Duration,
}

impl Default for InMemoryCheckpointer {
    fn default() -> Self {
        Self::with_idle_ttl(Duration::hours(DEFAULT_SESSION_IDLE_HOURS))
    }
}

impl InMemoryCheckpointer {
    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), idle_ttl }
    }

    pub async fn load(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    pub async fn save(&self, state: ConversationState) {
        let mut sessions = self.sessions.lock().await;
        let evicted = evict_idle(&mut sessions, Utc::now() - self.idle_ttl);
        if evicted > 0 {
            debug!(event_name = "agent.checkpointer.evicted", evicted, "dropped idle sessions");
        }
        sessions.insert(state.session_id.clone(), state);
    }

    /// Drops sessions last updated before `now - idle_ttl`.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        evict_idle(&mut *self.sessions.lock().await, now - self.idle_ttl)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn evict_idle(sessions: &mut HashMap<String, ConversationState>, cutoff: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, state| state.updated_at >= cutoff);
    before - sessions.len()
}

pub struct Specialists {
    pub inventory: SpecialistAgent,
    pub payment: SpecialistAgent,
    pub loyalty: SpecialistAgent,
    pub fulfillment: SpecialistAgent,
    pub post_purchase: SpecialistAgent,
    pub recommendation: SpecialistAgent,
}

impl Specialists {
    pub fn all(&self) -> [&SpecialistAgent; 6] {
        [
            &self.inventory,
            &self.payment,
            &self.loyalty,
            &self.fulfillment,
            &self.post_purchase,
            &self.recommendation,
        ]
    }
}

/// Deterministic tool contexts the nodes call directly when the model is
/// unavailable.
struct ToolContexts {
    inventory: Arc<InventoryTools>,
    loyalty: Arc<LoyaltyTools>,
    fulfillment: Arc<FulfillmentTools>,
    post_purchase: Arc<PostPurchaseTools>,
    recommendation: Arc<RecommendationTools>,
}

struct NodeOutput {
    reply: String,
    products: Vec<Product>,
}

impl NodeOutput {
    fn text(reply: impl Into<String>) -> Self {
        Self { reply: reply.into(), products: Vec::new() }
    }
}

pub struct SalesOrchestrator {
    storage: Storage,
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    settings: AgentConfig,
    classifier: KeywordIntentClassifier,
    extractor: PreferenceExtractor,
    specialists: Specialists,
    tools: ToolContexts,
    sessions: InMemoryCheckpointer,
}

impl SalesOrchestrator {
    pub fn new(
        storage: Storage,
        llm: Arc<dyn LlmClient>,
        settings: AgentConfig,
    ) -> Result<Self, AgentError> {
        Self::with_payment_outcomes(storage, llm, settings, Arc::new(RandomOutcome::default()))
    }

    pub fn with_payment_outcomes(
        storage: Storage,
        llm: Arc<dyn LlmClient>,
        settings: AgentConfig,
        outcomes: Arc<dyn PaymentOutcomeSource>,
    ) -> Result<Self, AgentError> {
        let prompts = Arc::new(PromptLibrary::new()?);
        let tools = ToolContexts {
            inventory: Arc::new(InventoryTools::new(storage.clone())),
            loyalty: Arc::new(LoyaltyTools::new(storage.clone())),
            fulfillment: Arc::new(FulfillmentTools::new(storage.clone())),
            post_purchase: Arc::new(PostPurchaseTools::new(storage.clone())),
            recommendation: Arc::new(RecommendationTools::new(
                storage.clone(),
                llm.clone(),
                prompts.clone(),
            )),
        };
        let payment_tools = Arc::new(PaymentTools::new(storage.clone(), outcomes));

        let build = |name: &'static str, role: &'static str, registry: ToolRegistry| {
            SpecialistAgent::new(name, role, registry, llm.clone(), &prompts, settings.max_iterations)
        };
        let specialists = Specialists {
            inventory: build(
                inventory::NAME,
                inventory::ROLE,
                inventory::registry(tools.inventory.clone()),
            )?,
            payment: build(payment::NAME, payment::ROLE, payment::registry(payment_tools))?,
            loyalty: build(loyalty::NAME, loyalty::ROLE, loyalty::registry(tools.loyalty.clone()))?,
            fulfillment: build(
                fulfillment::NAME,
                fulfillment::ROLE,
                fulfillment::registry(tools.fulfillment.clone()),
            )?,
            post_purchase: build(
                post_purchase::NAME,
                post_purchase::ROLE,
                post_purchase::registry(tools.post_purchase.clone()),
            )?,
            recommendation: build(
                recommendation::NAME,
                recommendation::ROLE,
                recommendation::registry(tools.recommendation.clone()),
            )?,
        };

        info!(
            event_name = "agent.orchestrator.ready",
            provider = llm.provider_name(),
            max_iterations = settings.max_iterations,
            max_history = settings.max_history,
            "sales orchestrator initialised"
        );

        Ok(Self {
            storage,
            llm,
            prompts,
            settings,
            classifier: KeywordIntentClassifier::new(),
            extractor: PreferenceExtractor::new(),
            specialists,
            tools,
            sessions: InMemoryCheckpointer::default(),
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn specialists(&self) -> &Specialists {
        &self.specialists
    }

    pub fn llm_provider(&self) -> &'static str {
        self.llm.provider_name()
    }

    /// Snapshot of a session's state.
    pub async fn session(&self, session_id: &str) -> Option<ConversationState> {
        self.sessions.load(session_id).await
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.len().await
    }

    /// Handles one user message. Only chat-history persistence can fail the
    /// turn.
    pub async fn process_message(&self, input: ChatInput) -> Result<ChatTurn, AgentError> {
        let now = Utc::now();
        let session_id = input
            .session_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_session_id);
        let customer_id = input
            .customer_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty() && id != GUEST)
            .map(CustomerId);

        let mut state = match self.sessions.load(&session_id).await {
            Some(mut state) => {
                state.switch_channel(input.channel, now);
                if customer_id.is_some() {
                    state.customer_id = customer_id;
                }
                state
            }
            None => ConversationState::new(session_id, input.channel, customer_id, now),
        };

        let message = input.message.trim().to_string();
        self.record(&state, ChatRole::User, &message, Value::Null).await?;
        state.messages.push(ChatMessage::user(message));
        state.interaction_count += 1;
        state.updated_at = now;

        state.current_intent = self.understand_intent(&state).await;
        info!(
            event_name = "agent.intent.classified",
            session_id = %state.session_id,
            intent = %state.current_intent,
            turn = state.interaction_count,
            "routing turn"
        );

        let output = self.route(&mut state).await;

        state.messages.push(ChatMessage::assistant(output.reply.clone()));
        trim_history(&mut state.messages, self.settings.max_history);
        if !output.products.is_empty() {
            state.last_viewed_products =
                output.products.iter().map(|product| product.sku.clone()).collect();
            state.recommended_products = output.products.clone();
        }

        let metadata = json!({
            "intent": state.current_intent,
            "has_products": !output.products.is_empty(),
        });
        self.record(&state, ChatRole::Assistant, &output.reply, metadata).await?;

        let turn = ChatTurn {
            response: output.reply,
            session_id: state.session_id.clone(),
            intent: state.current_intent,
            suggestions: suggestions(state.current_intent, &state.cart),
            products: (!output.products.is_empty()).then_some(output.products),
            cart_update: (!state.cart.is_empty())
                .then(|| CartUpdate { items: state.cart.clone(), total: state.cart_total }),
            available_coupons: state.available_coupons.clone(),
        };
        self.sessions.save(state).await;
        Ok(turn)
    }

    async fn record(
        &self,
        state: &ConversationState,
        role: ChatRole,
        content: &str,
        metadata: Value,
    ) -> Result<(), AgentError> {
        let message = StoredMessage {
            session_id: state.session_id.clone(),
            customer_id: customer_label(state).to_string(),
            role,
            content: content.to_string(),
            metadata,
            created_at: Utc::now(),
        };
        self.storage.chat.save_message(message).await?;
        Ok(())
    }

    /// Model classification validated against the seven labels, keyword
    /// rules on any failure.
    async fn understand_intent(&self, state: &ConversationState) -> Intent {
        #[derive(Deserialize)]
        struct IntentReply {
            intent: String,
        }

        let message = state.last_user_message();
        let classified = match self.prompts.intent(message, state.cart.len(), state.current_intent)
        {
            Ok(prompt) => complete_json::<IntentReply>(self.llm.as_ref(), &LlmRequest::prompt(prompt))
                .await
                .map_err(|error| error.to_string())
                .and_then(|reply| reply.intent.parse::<Intent>().map_err(|error| error.to_string())),
            Err(error) => Err(error.to_string()),
        };

        match classified {
            Ok(intent) => intent,
            Err(reason) => {
                let intent = self.classifier.classify(message);
                debug!(
                    event_name = "agent.intent.keyword_fallback",
                    session_id = %state.session_id,
                    intent = %intent,
                    reason = %reason,
                    "model classification unavailable"
                );
                intent
            }
        }
    }

    async fn route(&self, state: &mut ConversationState) -> NodeOutput {
        match state.current_intent {
            Intent::Greeting => self.greet(state).await,
            Intent::Browsing => {
                let result = self.recommend(state).await;
                recover("recommend_products", result, RECOMMEND_FALLBACK)
            }
            Intent::ProductInquiry => {
                let result = self.check_inventory(state).await;
                recover("check_inventory", result, INVENTORY_FALLBACK)
            }
            Intent::CartManagement => {
                let result = self.manage_cart(state).await;
                recover("manage_cart", result, CART_FALLBACK)
            }
            Intent::Checkout => self.checkout(state).await,
            Intent::Support => {
                let result = self.support(state).await;
                recover("handle_support", result, SUPPORT_FALLBACK)
            }
            Intent::End => {
                state.current_step = "ended".to_string();
                NodeOutput::text(FAREWELL)
            }
        }
    }

    async fn profile(&self, state: &ConversationState) -> Result<Option<CustomerProfile>, AgentError> {
        match &state.customer_id {
            Some(id) => Ok(self.storage.customers.find_profile(id).await?),
            None => Ok(None),
        }
    }

    async fn greet(&self, state: &mut ConversationState) -> NodeOutput {
        let name = match self.profile(state).await {
            Ok(Some(profile)) => profile.first_name().to_string(),
            Ok(None) => "there".to_string(),
            Err(error) => {
                warn!(event_name = "agent.orchestrator.profile_failed", error = %error, "greeting without a name");
                "there".to_string()
            }
        };
        state.current_step = "introduced".to_string();
        NodeOutput::text(greeting(&name))
    }

    async fn preferences(&self, message: &str) -> Preferences {
        let prompt = match self.prompts.preferences(message) {
            Ok(prompt) => prompt,
            Err(error) => {
                warn!(event_name = "agent.preferences.prompt_failed", error = %error, "preference prompt failed");
                return self.extractor.extract(message);
            }
        };
        match complete_json::<PreferenceArgs>(self.llm.as_ref(), &LlmRequest::prompt(prompt)).await {
            Ok(args) => Preferences::from(args),
            Err(error) => {
                debug!(
                    event_name = "agent.preferences.keyword_fallback",
                    error = %error,
                    "extracting preferences from keywords"
                );
                self.extractor.extract(message)
            }
        }
    }

    async fn recommend(&self, state: &mut ConversationState) -> Result<NodeOutput, AgentError> {
        let message = state.last_user_message().to_string();
        let customer_id = state.customer_id.as_ref().map(|id| id.0.clone());
        let preferences = self.preferences(&message).await;

        let request = self.prompts.recommend_request(
            &message,
            &preferences.favorite_categories,
            preferences.max_price.map(|price| price.to_string()),
            preferences.min_rating,
            customer_id.as_deref(),
        )?;

        match self.specialists.recommendation.run(&request).await {
            Ok(run) => {
                let products =
                    run.last_output("recommend_products").map(products_from_output).unwrap_or_default();
                debug!(
                    event_name = "agent.recommendation.completed",
                    products = products.len(),
                    "recommendation specialist replied"
                );
                Ok(NodeOutput { reply: run.reply, products })
            }
            Err(error) => {
                warn!(
                    event_name = "agent.recommendation.specialist_failed",
                    error = %error,
                    "recommending without the specialist"
                );
                let report = self
                    .tools
                    .recommendation
                    .recommend(RecommendArgs {
                        preferences: preference_args(&preferences),
                        context: message,
                        customer_id,
                        count: self.settings.recommendation_count,
                    })
                    .await?;
                let products =
                    report.recommendations.into_iter().map(|pick| pick.product).collect();
                Ok(NodeOutput { reply: report.message, products })
            }
        }
    }

    async fn check_inventory(&self, state: &mut ConversationState) -> Result<NodeOutput, AgentError> {
        let message = state.last_user_message().to_string();
        let lower = message.to_lowercase();
        let skus = extract_skus(&message);
        let categories = mentioned_categories_in(&message);

        if skus.is_empty() && !lower.contains("sku") && (!categories.is_empty() || lower.contains("stock"))
        {
            let category = categories.first().copied();
            let mut products = self
                .storage
                .catalog
                .list_products(&ProductQuery { category, ..ProductQuery::default() })
                .await?;
            products.sort_by(|left, right| right.rating.total_cmp(&left.rating));
            products.truncate(TABLE_ROWS);

            if !products.is_empty() {
                let label = category.map_or("products", |category| category.as_str());
                let table = self.tools.inventory.stock_table(label, &products).await?;
                return Ok(NodeOutput { reply: table, products });
            }
        }

        let profile = self.profile(state).await?;
        let request =
            self.prompts.inventory_request(&message, profile.as_ref().and_then(CustomerProfile::city))?;
        match self.specialists.inventory.run(&request).await {
            Ok(run) => Ok(NodeOutput::text(run.reply)),
            Err(error) => {
                let Some(sku) = skus.into_iter().next() else {
                    return Err(error);
                };
                warn!(
                    event_name = "agent.inventory.specialist_failed",
                    error = %error,
                    sku = %sku,
                    "checking availability directly"
                );
                let report = self
                    .tools
                    .inventory
                    .check_availability(AvailabilityArgs {
                        sku,
                        quantity: extract_quantity(&message).unwrap_or(1),
                    })
                    .await?;
                Ok(NodeOutput::text(report.message))
            }
        }
    }

    async fn manage_cart(&self, state: &mut ConversationState) -> Result<NodeOutput, AgentError> {
        let message = state.last_user_message().to_string();

        let reply = match parse_cart_command(&message) {
            CartCommand::View => cart_view(state),
            CartCommand::Clear => {
                state.clear_cart();
                "🗑️ Your cart is now empty.".to_string()
            }
            CartCommand::Remove { sku, quantity } => {
                let lower = message.to_lowercase();
                let target = sku.or_else(|| {
                    state
                        .cart
                        .iter()
                        .find(|item| lower.contains(&item.name.to_lowercase()))
                        .map(|item| item.sku.clone())
                });
                let removed = target.and_then(|sku| {
                    let name = state.cart.iter().find(|item| item.sku == sku)?.name.clone();
                    state.remove_from_cart(&sku, quantity).then_some(name)
                });
                match removed {
                    Some(name) => format!("Removed **{name}** from your cart.\n\n{}", cart_view(state)),
                    None => format!("I couldn't find that item in your cart.\n\n{}", cart_view(state)),
                }
            }
            CartCommand::Add { sku, quantity } => {
                let product = match sku {
                    Some(sku) => self.storage.catalog.find_product(&sku).await?,
                    None => match match_product(&message, &state.recommended_products) {
                        Some(product) => Some(product.clone()),
                        None => {
                            let catalogue =
                                self.storage.catalog.list_products(&ProductQuery::default()).await?;
                            match_product(&message, &catalogue).cloned()
                        }
                    },
                };

                match product {
                    None => "I couldn't tell which product to add. Share its SKU (like FOO1000) or its name."
                        .to_string(),
                    Some(product) => {
                        // units already in the cart count against the same stock
                        let in_cart: u32 = state
                            .cart
                            .iter()
                            .filter(|item| item.sku == product.sku)
                            .map(|item| item.quantity)
                            .sum();
                        let report = self
                            .tools
                            .inventory
                            .check_availability(AvailabilityArgs {
                                sku: product.sku.clone(),
                                quantity: quantity + in_cart,
                            })
                            .await?;
                        if product.is_available && report.can_fulfill {
                            state.add_to_cart(CartItem::from_product(&product, quantity));
                            format!(
                                "✅ Added {quantity} × **{}** to your cart.\n\n{}",
                                product.name,
                                cart_view(state)
                            )
                        } else {
                            let held = if in_cart > 0 {
                                format!(" on top of the {in_cart} already in your cart")
                            } else {
                                String::new()
                            };
                            format!(
                                "Sorry, we can't supply {quantity} × **{}**{held} right now.",
                                product.name
                            )
                        }
                    }
                }
            }
        };

        state.current_step = "cart".to_string();
        Ok(NodeOutput::text(reply))
    }

    /// Checkout runs payment summary then order creation in one turn.
    async fn checkout(&self, state: &mut ConversationState) -> NodeOutput {
        if state.cart.is_empty() {
            return NodeOutput::text(EMPTY_CART_CHECKOUT);
        }

        let (summary, payable) = match self.process_payment(state).await {
            Ok(summary) => {
                let payable = summary.final_total;
                (checkout_text(&summary), payable)
            }
            Err(error) => {
                warn!(event_name = "agent.orchestrator.node_failed", node = "process_payment", error = %error, "replying with fallback");
                (PAYMENT_FALLBACK.to_string(), state.cart_total)
            }
        };

        let fulfilled = self.fulfill_order(state, payable).await;
        let fulfilled = recover("fulfill_order", fulfilled, FULFILL_FALLBACK);
        NodeOutput::text(format!("{summary}\n\n{}", fulfilled.reply))
    }

    async fn process_payment(
        &self,
        state: &mut ConversationState,
    ) -> Result<CheckoutSummary, AgentError> {
        let report = self
            .tools
            .loyalty
            .checkout_summary(CheckoutArgs {
                cart_total: state.cart_total,
                customer_id: state.customer_id.as_ref().map(|id| id.0.clone()),
            })
            .await?;
        let summary = report.summary;

        state.available_coupons = self.storage.coupons.list_available(summary.tier.level()).await?;
        state.applied_coupon = Some(summary.applied.code.clone());
        state.current_step = "payment_selection".to_string();

        info!(
            event_name = "agent.checkout.summarised",
            session_id = %state.session_id,
            coupon = %summary.applied.code,
            final_total = %summary.final_total,
            "checkout discount applied"
        );
        Ok(summary)
    }

    /// The fulfillment specialist creates the order. The cart is cleared only
    /// once an order exists.
    async fn fulfill_order(
        &self,
        state: &mut ConversationState,
        payable: Decimal,
    ) -> Result<NodeOutput, AgentError> {
        let customer_id = customer_label(state).to_string();
        let profile = self.profile(state).await?;
        let address = profile.as_ref().and_then(delivery_address);
        let items: Vec<CartLine> = state
            .cart
            .iter()
            .map(|item| CartLine {
                sku: item.sku.clone(),
                name: Some(item.name.clone()),
                quantity: item.quantity,
                price: Some(item.price),
            })
            .collect();

        let address_json = address.as_ref().map(address_value);
        let request = self.prompts.fulfillment_request(
            &customer_id,
            &serde_json::to_value(&state.cart).unwrap_or(Value::Null),
            &Value::String(payable.to_string()),
            "ship_to_home",
            address_json.as_ref(),
        )?;

        let (reply, order_id) = match self.specialists.fulfillment.run(&request).await {
            Ok(run) => {
                let order_id = run.last_output("create_order").and_then(confirmed_order_id);
                (run.reply, order_id)
            }
            Err(error) => {
                let Some(address) = address else {
                    warn!(
                        event_name = "agent.fulfillment.no_address",
                        error = %error,
                        "cannot create an order without a delivery address"
                    );
                    return Ok(NodeOutput::text(
                        "To place your order I need a delivery address. Please share it and say checkout again.",
                    ));
                };
                warn!(
                    event_name = "agent.fulfillment.specialist_failed",
                    error = %error,
                    "creating the order directly"
                );
                let confirmation = self
                    .tools
                    .fulfillment
                    .create_order(CreateOrderArgs {
                        customer_id,
                        cart_items: items,
                        total_amount: payable,
                        fulfillment_type: "ship_to_home".to_string(),
                        delivery_address: Some(address),
                        pickup_store_id: None,
                        special_instructions: None,
                    })
                    .await?;
                let order_id = confirmation.order_id.filter(|_| confirmation.success);
                (confirmation.message, order_id)
            }
        };

        if let Some(order_id) = order_id {
            info!(
                event_name = "agent.orchestrator.order_placed",
                session_id = %state.session_id,
                order_id = %order_id,
                "order created, clearing cart"
            );
            state.order_id = Some(order_id);
            state.clear_cart();
            state.current_step = "order_placed".to_string();
        }
        Ok(NodeOutput::text(reply))
    }

    async fn support(&self, state: &mut ConversationState) -> Result<NodeOutput, AgentError> {
        let message = state.last_user_message().to_string();
        let request = self.prompts.support_request(&message, customer_label(state))?;

        match self.specialists.post_purchase.run(&request).await {
            Ok(run) => Ok(NodeOutput::text(run.reply)),
            Err(error) => {
                let Some(order_id) =
                    extract_order_id(&message).or_else(|| state.order_id.as_ref().map(|id| id.0.clone()))
                else {
                    return Err(error);
                };
                warn!(
                    event_name = "agent.support.specialist_failed",
                    error = %error,
                    order_id = %order_id,
                    "tracking the order directly"
                );
                let tracking = self
                    .tools
                    .post_purchase
                    .track_detailed(post_purchase::OrderArgs { order_id })
                    .await?;
                Ok(NodeOutput::text(tracking.message))
            }
        }
    }
}

fn recover(node: &'static str, result: Result<NodeOutput, AgentError>, fallback: &str) -> NodeOutput {
    result.unwrap_or_else(|error| {
        warn!(
            event_name = "agent.orchestrator.node_failed",
            node,
            error = %error,
            "replying with fallback"
        );
        NodeOutput::text(fallback)
    })
}

fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("session_{}", &hex[..12])
}

fn customer_label(state: &ConversationState) -> &str {
    state.customer_id.as_ref().map_or(GUEST, CustomerId::as_str)
}

/// Keeps the most recent `max` messages.
fn trim_history(messages: &mut Vec<ChatMessage>, max: usize) {
    if max > 0 && messages.len() > max {
        messages.drain(..messages.len() - max);
    }
}

fn preference_args(preferences: &Preferences) -> PreferenceArgs {
    PreferenceArgs {
        favorite_categories: preferences
            .favorite_categories
            .iter()
            .map(|category| category.as_str().to_string())
            .collect(),
        max_price: preferences.max_price,
        min_rating: preferences.min_rating,
        keywords: preferences.keywords.clone(),
    }
}

fn delivery_address(profile: &CustomerProfile) -> Option<AddressArgs> {
    profile.address.as_ref().map(|address| AddressArgs {
        name: profile.name.clone(),
        street: address.street.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        pincode: address.pincode.clone(),
        phone: profile.phone.clone(),
    })
}

fn address_value(address: &AddressArgs) -> Value {
    json!({
        "name": address.name,
        "street": address.street,
        "city": address.city,
        "state": address.state,
        "pincode": address.pincode,
        "phone": address.phone,
    })
}

fn confirmed_order_id(output: &Value) -> Option<OrderId> {
    if output.get("success").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    output.get("order_id").and_then(Value::as_str).map(|id| OrderId(id.to_string()))
}

fn greeting(name: &str) -> String {
    format!(
        "Hello {name}! 👋\n\
         Welcome to our store! I'm your personal shopping assistant. I can help you:\n\
         ✨ Find products you'll love\n\
         📦 Check real-time stock availability\n\
         🛒 Manage your shopping cart\n\
         💳 Complete secure checkout\n\
         🚚 Track orders and handle returns\n\n\
         What are you looking for today?"
    )
}

fn cart_view(state: &ConversationState) -> String {
    if state.cart.is_empty() {
        return EMPTY_CART.to_string();
    }

    let mut text = format!("Your cart has {} item(s):\n\n", state.cart.len());
    for item in &state.cart {
        text.push_str(&format!(
            "• {} x{} - {}\n",
            item.name,
            item.quantity,
            format_inr(item.line_total())
        ));
    }
    text.push_str(&format!("\n**Total: {}**\n\n", format_inr(state.cart_total)));
    text.push_str("Proceed to checkout or continue shopping?");
    text
}

fn checkout_text(summary: &CheckoutSummary) -> String {
    let rule = "━━━━━━━━━━━━━━━━━━━━━━━━━";
    let mut text = format!(
        "🎉 **CHECKOUT - DISCOUNT APPLIED!**\n\n\
         **Order Summary:**\n{rule}\n\
         Subtotal:       {}\n\
         Discount ({}): -{}\n{rule}\n\
         **Final Total:  {}**\n{rule}\n\n\
         💰 You saved {}!\n\
         🎁 You'll earn {} loyalty points!\n",
        format_inr(summary.subtotal),
        summary.applied.code,
        format_inr(summary.savings),
        format_inr(summary.final_total),
        format_inr(summary.savings),
        summary.points_earned,
    );

    if !summary.other_coupons.is_empty() {
        text.push_str("\n**📋 Other Available Coupons:**\n");
        for coupon in &summary.other_coupons {
            let amount = match coupon.discount_type {
                DiscountType::Percentage => format!("{}%", coupon.discount_value.normalize()),
                DiscountType::Flat => format_inr_whole(coupon.discount_value),
            };
            text.push_str(&format!("• **{}**: {} {amount}\n", coupon.code, coupon.description));
        }
    }

    text.push('\n');
    text.push_str(PAYMENT_METHODS);
    text
}

fn suggestions(intent: Intent, cart: &[CartItem]) -> Vec<String> {
    let options: &[&str] = match intent {
        Intent::Greeting => &["Show me footwear", "I'm looking for electronics", "What's on sale?"],
        Intent::Browsing | Intent::ProductInquiry => {
            &["Add to cart", "Check stock", "Show more", "Apply discount"]
        }
        _ if !cart.is_empty() => &["Checkout", "View cart", "Continue shopping"],
        _ => &["Browse products", "Track order", "Help & Support"],
    };
    options.iter().map(|option| option.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{trim_history, ChatInput, InMemoryCheckpointer, SalesOrchestrator, FAREWELL};
    use crate::llm::{LlmClient, OfflineLlmClient, ScriptedLlmClient};
    use crate::specialists::payment::FixedOutcome;
    use shopwise_core::config::AgentConfig;
    use shopwise_core::domain::catalog::Category;
    use shopwise_core::domain::conversation::{
        Channel, ChatMessage, ChatRole, ConversationState, Intent,
    };
    use shopwise_core::domain::inventory::StockRecord;
    use shopwise_core::domain::order::OrderId;
    use shopwise_db::{DemoDataset, Storage};

    fn settings() -> AgentConfig {
        AgentConfig { max_iterations: 4, max_history: 10, recommendation_count: 5 }
    }

    async fn seeded() -> Result<Storage, String> {
        let storage = Storage::in_memory();
        DemoDataset::standard(Utc::now()).load(&storage).await.map_err(|e| e.to_string())?;
        storage
            .inventory
            .save_stock(StockRecord {
                sku: "FOO1000".to_string(),
                location_id: "WH_CENTRAL".to_string(),
                quantity: 50,
                reserved: 0,
            })
            .await
            .map_err(|e| e.to_string())?;
        Ok(storage)
    }

    fn orchestrator(storage: Storage, llm: Arc<dyn LlmClient>) -> SalesOrchestrator {
        SalesOrchestrator::with_payment_outcomes(storage, llm, settings(), Arc::new(FixedOutcome(true)))
            .expect("orchestrator builds")
    }

    #[tokio::test]
    async fn greets_known_customer_by_first_name() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"intent": "greeting"}"#]));
        let bot = orchestrator(seeded().await?, llm);

        let turn = bot
            .process_message(ChatInput::new("hello!").for_customer("CUST1000"))
            .await
            .map_err(|e| e.to_string())?;

        assert!(turn.response.starts_with("Hello Rahul! 👋"));
        assert_eq!(turn.intent, Intent::Greeting);
        assert!(turn.session_id.starts_with("session_"));
        assert_eq!(turn.session_id.len(), "session_".len() + 12);
        assert_eq!(turn.suggestions[0], "Show me footwear");
        assert!(turn.products.is_none());
        assert!(turn.cart_update.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_label_from_model_falls_back_to_keywords() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([r#"{"intent": "haggling"}"#]));
        let bot = orchestrator(seeded().await?, llm);

        let turn = bot.process_message(ChatInput::new("thanks, bye")).await.map_err(|e| e.to_string())?;
        assert_eq!(turn.intent, Intent::End);
        assert_eq!(turn.response, FAREWELL);
        assert_eq!(turn.suggestions, vec!["Browse products", "Track order", "Help & Support"]);
        Ok(())
    }

    #[tokio::test]
    async fn offline_browsing_still_recommends_by_rating() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let turn = bot
            .process_message(ChatInput::new("show me running shoes"))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(turn.intent, Intent::Browsing);
        assert!(turn.response.starts_with("Here are my top picks for you:"));
        let products = turn.products.ok_or("expected products")?;
        assert!(!products.is_empty() && products.len() <= 5);
        assert!(products.iter().all(|product| product.category == Category::Footwear));

        let state = bot.session(&turn.session_id).await.ok_or("session stored")?;
        assert_eq!(state.recommended_products.len(), products.len());
        assert_eq!(state.last_viewed_products[0], products[0].sku);
        Ok(())
    }

    #[tokio::test]
    async fn browsing_uses_products_from_the_specialists_tool_call() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"intent": "browsing"}"#,
            r#"{"favorite_categories": ["Electronics"], "max_price": null, "min_rating": null, "keywords": []}"#,
            r#"{"tool": "recommend_products", "arguments": {"preferences": {"favorite_categories": ["Electronics"]}, "context": "gadgets", "count": 3}}"#,
            r#"{"recommendations": []}"#,
            r#"{"reply": "Here are three gadgets you might like."}"#,
        ]));
        let bot = orchestrator(seeded().await?, llm.clone());

        let turn = bot
            .process_message(ChatInput::new("any cool gadgets?"))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(turn.response, "Here are three gadgets you might like.");
        let products = turn.products.ok_or("expected products")?;
        assert_eq!(products.len(), 3);
        assert!(products.iter().all(|product| product.category == Category::Electronics));
        assert_eq!(llm.remaining().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn specialist_tool_error_is_summarised_without_products() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"intent": "browsing"}"#,
            r#"{"favorite_categories": [], "keywords": []}"#,
            r#"{"tool": "get_trending_products", "arguments": {"category": "Toys"}}"#,
        ]));
        let bot = orchestrator(seeded().await?, llm);

        let turn = bot
            .process_message(ChatInput::new("surprise me"))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(turn.response, "Sorry, something went wrong while looking that up.");
        assert!(turn.products.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn category_stock_question_renders_a_table() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let turn = bot
            .process_message(ChatInput::new("is footwear in stock?"))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(turn.intent, Intent::ProductInquiry);
        assert!(turn.response.starts_with("📦 **STOCK AVAILABILITY - FOOTWEAR**"));
        let products = turn.products.ok_or("expected products")?;
        assert_eq!(products.len(), 10);
        assert!(products.windows(2).all(|pair| pair[0].rating >= pair[1].rating));
        Ok(())
    }

    #[tokio::test]
    async fn sku_stock_question_checks_availability_when_offline() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let turn = bot
            .process_message(ChatInput::new("is FOO1000 in stock?"))
            .await
            .map_err(|e| e.to_string())?;

        assert!(turn.response.contains("Stock Availability for **FOO1000**"));
        Ok(())
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let sessions = InMemoryCheckpointer::with_idle_ttl(chrono::Duration::hours(1));
        let now = Utc::now();
        sessions
            .save(ConversationState::new("stale", Channel::Web, None, now - chrono::Duration::hours(3)))
            .await;
        assert_eq!(sessions.len().await, 1, "eviction runs before the insert");

        sessions.save(ConversationState::new("fresh", Channel::Web, None, now)).await;
        assert!(sessions.load("stale").await.is_none());
        assert!(sessions.load("fresh").await.is_some());

        assert_eq!(sessions.evict_idle(now + chrono::Duration::hours(2)).await, 1);
        assert!(sessions.is_empty().await);
    }

    #[tokio::test]
    async fn repeated_adds_cannot_exceed_total_stock() -> Result<(), String> {
        let storage = seeded().await?;
        for location in ["WH_CENTRAL", "MUM01", "DEL01", "BLR01", "HYD01", "CHN01"] {
            storage
                .inventory
                .save_stock(StockRecord {
                    sku: "FOO1000".to_string(),
                    location_id: location.to_string(),
                    quantity: if location == "WH_CENTRAL" { 3 } else { 0 },
                    reserved: 0,
                })
                .await
                .map_err(|e| e.to_string())?;
        }
        let bot = orchestrator(storage, Arc::new(OfflineLlmClient));

        let first = bot
            .process_message(ChatInput::new("add 2 FOO1000 to my cart"))
            .await
            .map_err(|e| e.to_string())?;
        assert!(first.response.starts_with("✅ Added 2 × **"));

        let second = bot
            .process_message(ChatInput::new("add 2 FOO1000 to my cart").in_session(&first.session_id))
            .await
            .map_err(|e| e.to_string())?;
        assert!(second.response.starts_with("Sorry, we can't supply 2 × **"));
        assert!(second.response.contains("the 2 already in your cart"));
        assert_eq!(second.cart_update.ok_or("cart kept")?.items[0].quantity, 2);

        let third = bot
            .process_message(ChatInput::new("add 1 FOO1000 to my cart").in_session(&first.session_id))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(third.cart_update.ok_or("cart kept")?.items[0].quantity, 3);
        Ok(())
    }

    #[tokio::test]
    async fn cart_add_view_remove_and_clear() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let first = bot
            .process_message(ChatInput::new("add 2 FOO1000 to my cart"))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(first.intent, Intent::CartManagement);
        assert!(first.response.starts_with("✅ Added 2 × **"));
        let update = first.cart_update.clone().ok_or("expected cart update")?;
        assert_eq!(update.items[0].quantity, 2);
        assert_eq!(update.total, update.items[0].price * Decimal::from(2));
        assert_eq!(first.suggestions, vec!["Checkout", "View cart", "Continue shopping"]);

        let session = first.session_id.clone();
        let view = bot
            .process_message(ChatInput::new("show my cart").in_session(&session))
            .await
            .map_err(|e| e.to_string())?;
        assert!(view.response.starts_with("Your cart has 1 item(s):"));
        assert!(view.response.contains("**Total: ₹"));

        let removed = bot
            .process_message(ChatInput::new("remove 1 FOO1000 from cart").in_session(&session))
            .await
            .map_err(|e| e.to_string())?;
        assert!(removed.response.starts_with("Removed **"));
        assert_eq!(removed.cart_update.ok_or("cart kept")?.items[0].quantity, 1);

        let cleared = bot
            .process_message(ChatInput::new("clear my cart").in_session(&session))
            .await
            .map_err(|e| e.to_string())?;
        assert!(cleared.cart_update.is_none());

        let empty = bot
            .process_message(ChatInput::new("what's in my cart").in_session(&session))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(empty.response, "Your cart is empty. Let me help you find something!");
        Ok(())
    }

    #[tokio::test]
    async fn offline_checkout_summarises_and_creates_the_order() -> Result<(), String> {
        let storage = seeded().await?;
        let bot = orchestrator(storage.clone(), Arc::new(OfflineLlmClient));

        let added = bot
            .process_message(ChatInput::new("add FOO1000 to cart").for_customer("CUST1000"))
            .await
            .map_err(|e| e.to_string())?;
        let checkout = bot
            .process_message(ChatInput::new("I want to checkout").in_session(&added.session_id))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(checkout.intent, Intent::Checkout);
        assert!(checkout.response.starts_with("🎉 **CHECKOUT - DISCOUNT APPLIED!**"));
        assert!(checkout.response.contains("Which would you prefer?"));
        assert!(checkout.response.contains("has been confirmed."));
        assert!(checkout.cart_update.is_none());
        assert!(!checkout.available_coupons.is_empty());

        let state = bot.session(&checkout.session_id).await.ok_or("session stored")?;
        let order_id: OrderId = state.order_id.ok_or("order recorded")?;
        let order = storage
            .orders
            .find_by_id(&order_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or("order saved")?;
        assert_eq!(order.items[0].sku, "FOO1000");
        assert!(state.applied_coupon.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn guest_checkout_without_address_keeps_the_cart() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let added = bot
            .process_message(ChatInput::new("add FOO1000 to cart"))
            .await
            .map_err(|e| e.to_string())?;
        let checkout = bot
            .process_message(ChatInput::new("checkout").in_session(&added.session_id))
            .await
            .map_err(|e| e.to_string())?;

        assert!(checkout.response.contains("I need a delivery address"));
        assert!(checkout.cart_update.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn checkout_with_an_empty_cart_short_circuits() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));
        let turn = bot.process_message(ChatInput::new("checkout")).await.map_err(|e| e.to_string())?;
        assert!(turn.response.starts_with("Your cart is empty, so there's nothing to check out"));
        assert!(turn.available_coupons.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn support_without_model_or_order_id_apologises() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));
        let turn = bot
            .process_message(ChatInput::new("I want a refund"))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(turn.intent, Intent::Support);
        assert!(turn.response.contains("Could you share your order ID?"));
        Ok(())
    }

    #[tokio::test]
    async fn support_passes_customer_id_to_the_specialist() -> Result<(), String> {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"intent": "support"}"#,
            r#"{"tool": "get_faq_answer", "arguments": {"question_category": "returns"}}"#,
            r#"{"reply": "You can return items within 30 days."}"#,
        ]));
        let bot = orchestrator(seeded().await?, llm.clone());

        let turn = bot
            .process_message(ChatInput::new("how do returns work?").for_customer("CUST1001"))
            .await
            .map_err(|e| e.to_string())?;

        assert_eq!(turn.response, "You can return items within 30 days.");
        let requests = llm.requests().await;
        assert!(requests[1].messages[0].content.contains("Customer ID: CUST1001"));
        Ok(())
    }

    #[tokio::test]
    async fn turns_are_persisted_with_metadata() -> Result<(), String> {
        let storage = seeded().await?;
        let bot = orchestrator(storage.clone(), Arc::new(OfflineLlmClient));

        let turn = bot.process_message(ChatInput::new("hi")).await.map_err(|e| e.to_string())?;
        let history = storage.chat.history(&turn.session_id, 10).await.map_err(|e| e.to_string())?;

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].customer_id, "guest");
        assert_eq!(history[1].role, ChatRole::Assistant);
        assert_eq!(history[1].metadata["intent"], "greeting");
        assert_eq!(history[1].metadata["has_products"], false);
        Ok(())
    }

    #[tokio::test]
    async fn sessions_survive_between_turns_and_track_channels() -> Result<(), String> {
        let bot = orchestrator(seeded().await?, Arc::new(OfflineLlmClient));

        let first = bot.process_message(ChatInput::new("hello")).await.map_err(|e| e.to_string())?;
        let mut second = ChatInput::new("bye").in_session(&first.session_id);
        second.channel = shopwise_core::domain::conversation::Channel::Whatsapp;
        bot.process_message(second).await.map_err(|e| e.to_string())?;

        let state = bot.session(&first.session_id).await.ok_or("session stored")?;
        assert_eq!(state.interaction_count, 2);
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.channel_history.len(), 2);
        assert_eq!(state.current_step, "ended");
        assert_eq!(bot.active_sessions().await, 1);
        Ok(())
    }

    #[test]
    fn history_keeps_the_latest_messages() {
        let mut messages: Vec<ChatMessage> =
            (0..7).map(|index| ChatMessage::user(format!("m{index}"))).collect();
        trim_history(&mut messages, 4);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].content, "m3");
    }

    #[test]
    fn builds_all_six_specialists() {
        let bot = SalesOrchestrator::new(Storage::in_memory(), Arc::new(OfflineLlmClient), settings())
            .expect("orchestrator builds");
        let names: Vec<&str> = bot.specialists().all().iter().map(|agent| agent.name()).collect();
        assert_eq!(
            names,
            vec!["inventory", "payment", "loyalty", "fulfillment", "post_purchase", "recommendation"]
        );
        assert!(bot.specialists().payment.tools().contains("initiate_payment"));
    }
}
