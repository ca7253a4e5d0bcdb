//! Deterministic retail rules shared by the agent tools and the orchestrator.

pub mod checkout;
pub mod fulfillment;
pub mod loyalty;
pub mod payments;
pub mod recommend;
pub mod stock;
