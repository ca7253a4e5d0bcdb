use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{Category, Product};
use crate::domain::customer::CustomerId;
use crate::domain::loyalty::Coupon;
use crate::domain::order::OrderId;
use crate::errors::DomainError;

/// The seven branches a user turn can be routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    Greeting,
    Browsing,
    ProductInquiry,
    CartManagement,
    Checkout,
    Support,
    End,
}

impl Intent {
    pub const ALL: [Intent; 7] = [
        Intent::Greeting,
        Intent::Browsing,
        Intent::ProductInquiry,
        Intent::CartManagement,
        Intent::Checkout,
        Intent::Support,
        Intent::End,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Browsing => "browsing",
            Self::ProductInquiry => "product_inquiry",
            Self::CartManagement => "cart_management",
            Self::Checkout => "checkout",
            Self::Support => "support",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|intent| intent.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownValue { kind: "intent", value: value.to_string() })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    #[default]
    Web,
    Whatsapp,
    Telegram,
    Kiosk,
    Voice,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Whatsapp => "whatsapp",
            Self::Telegram => "telegram",
            Self::Kiosk => "kiosk",
            Self::Voice => "voice",
        }
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "web" => Ok(Self::Web),
            "whatsapp" => Ok(Self::Whatsapp),
            "telegram" => Ok(Self::Telegram),
            "kiosk" => Ok(Self::Kiosk),
            "voice" => Ok(Self::Voice),
            _ => Err(DomainError::UnknownValue { kind: "channel", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
    System,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::System => "system",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "tool" => Some(Self::Tool),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Tool, content: content.into() }
    }
}

/// A persisted chat line, keyed by session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub customer_id: String,
    pub role: ChatRole,
    pub content: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub category: Option<Category>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            category: Some(product.category),
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelVisit {
    pub channel: Channel,
    pub timestamp: DateTime<Utc>,
}

/// Everything the orchestrator threads between turns of one session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: String,
    pub customer_id: Option<CustomerId>,
    pub channel: Channel,
    pub messages: Vec<ChatMessage>,
    pub cart: Vec<CartItem>,
    pub cart_total: Decimal,
    pub current_intent: Intent,
    pub current_step: String,
    pub recommended_products: Vec<Product>,
    pub last_viewed_products: Vec<String>,
    pub available_coupons: Vec<Coupon>,
    pub applied_coupon: Option<String>,
    pub order_id: Option<OrderId>,
    pub channel_history: Vec<ChannelVisit>,
    pub interaction_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(
        session_id: impl Into<String>,
        channel: Channel,
        customer_id: Option<CustomerId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            customer_id,
            channel,
            messages: Vec::new(),
            cart: Vec::new(),
            cart_total: Decimal::ZERO,
            current_intent: Intent::Greeting,
            current_step: "greeting".to_string(),
            recommended_products: Vec::new(),
            last_viewed_products: Vec::new(),
            available_coupons: Vec::new(),
            applied_coupon: None,
            order_id: None,
            channel_history: vec![ChannelVisit { channel, timestamp: now }],
            interaction_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn last_user_message(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or("")
    }

    pub fn last_assistant_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::Assistant)
            .map(|message| message.content.as_str())
    }

    /// Records a channel hop when the same session continues elsewhere.
    pub fn switch_channel(&mut self, channel: Channel, now: DateTime<Utc>) {
        if self.channel != channel {
            self.channel = channel;
            self.channel_history.push(ChannelVisit { channel, timestamp: now });
        }
    }

    pub fn add_to_cart(&mut self, item: CartItem) {
        match self.cart.iter_mut().find(|existing| existing.sku == item.sku) {
            Some(existing) => existing.quantity += item.quantity,
            None => self.cart.push(item),
        }
        self.recompute_cart_total();
    }

    /// Removes up to `quantity` units (all units when `None`). Returns whether
    /// anything was removed.
    pub fn remove_from_cart(&mut self, sku: &str, quantity: Option<u32>) -> bool {
        let Some(index) = self.cart.iter().position(|item| item.sku == sku) else {
            return false;
        };

        match quantity {
            Some(quantity) if quantity < self.cart[index].quantity => {
                self.cart[index].quantity -= quantity;
            }
            _ => {
                self.cart.remove(index);
            }
        }
        self.recompute_cart_total();
        true
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
        self.cart_total = Decimal::ZERO;
    }

    pub fn cart_item_count(&self) -> u32 {
        self.cart.iter().map(|item| item.quantity).sum()
    }

    fn recompute_cart_total(&mut self) {
        self.cart_total = self.cart.iter().map(CartItem::line_total).sum();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{CartItem, Channel, ChatMessage, ConversationState, Intent};

    fn item(sku: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            price: Decimal::new(price, 0),
            quantity,
            category: None,
        }
    }

    #[test]
    fn new_state_starts_with_one_channel_visit() {
        let state = ConversationState::new("session_abc", Channel::Web, None, Utc::now());
        assert_eq!(state.channel_history.len(), 1);
        assert_eq!(state.current_intent, Intent::Greeting);
        assert_eq!(state.cart_total, Decimal::ZERO);
    }

    #[test]
    fn cart_total_tracks_merges_and_removals() {
        let mut state = ConversationState::new("s", Channel::Web, None, Utc::now());
        state.add_to_cart(item("FOO1000", 1_000, 1));
        state.add_to_cart(item("FOO1000", 1_000, 2));
        state.add_to_cart(item("ACC1080", 500, 1));

        assert_eq!(state.cart.len(), 2);
        assert_eq!(state.cart_total, Decimal::new(3_500, 0));

        assert!(state.remove_from_cart("FOO1000", Some(1)));
        assert_eq!(state.cart_total, Decimal::new(2_500, 0));
        assert!(state.remove_from_cart("ACC1080", None));
        assert!(!state.remove_from_cart("ACC1080", None));
        assert_eq!(state.cart_item_count(), 2);

        state.clear_cart();
        assert!(state.cart.is_empty());
        assert_eq!(state.cart_total, Decimal::ZERO);
    }

    #[test]
    fn intent_labels_parse_exactly() {
        for intent in Intent::ALL {
            assert_eq!(intent.as_str().parse::<Intent>(), Ok(intent));
        }
        assert!("shopping".parse::<Intent>().is_err());
    }

    #[test]
    fn last_user_message_skips_assistant_turns() {
        let mut state = ConversationState::new("s", Channel::Web, None, Utc::now());
        state.messages.push(ChatMessage::user("show me shoes"));
        state.messages.push(ChatMessage::assistant("here you go"));
        assert_eq!(state.last_user_message(), "show me shoes");
        assert_eq!(state.last_assistant_message(), Some("here you go"));
    }

    #[test]
    fn switching_channel_appends_history_once() {
        let mut state = ConversationState::new("s", Channel::Web, None, Utc::now());
        state.switch_channel(Channel::Web, Utc::now());
        state.switch_channel(Channel::Whatsapp, Utc::now());
        assert_eq!(state.channel_history.len(), 2);
        assert_eq!(state.channel, Channel::Whatsapp);
    }
}
