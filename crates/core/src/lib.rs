pub mod commerce;
pub mod config;
pub mod domain;
pub mod errors;

pub use config::{AppConfig, LlmProvider, LoadOptions};
pub use domain::catalog::{Category, Product, ProductQuery};
pub use domain::conversation::{CartItem, Channel, ChatMessage, ChatRole, ConversationState, Intent};
pub use domain::customer::{CustomerId, CustomerProfile};
pub use domain::loyalty::{Coupon, LoyaltyTier};
pub use domain::order::{Order, OrderId, OrderStatus};
pub use errors::{ApplicationError, DomainError, InterfaceError};
