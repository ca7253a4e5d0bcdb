//! Agent runtime - intent routing, specialist tool loops and LLM clients
//!
//! This crate is the conversational layer of shopwise:
//! - Classifies each customer message into one of seven intents
//! - Routes the turn to a node that may delegate to a specialist agent
//! - Runs specialists as prompt-level tool loops over the retail stores
//! - Keeps per-session conversation state between turns
//!
//! # Architecture
//!
//! 1. **Intent** (`orchestrator`, `intent`) - model classification with a
//!    keyword fallback
//! 2. **Routing** (`orchestrator`) - fixed dispatch table, one node per intent
//! 3. **Specialists** (`specialists`) - inventory, payment, loyalty,
//!    fulfillment, post-purchase and recommendation tool sets
//! 4. **Tools** (`tools`) - typed JSON tools over the `shopwise-db` storage
//!
//! # Key Types
//!
//! - `SalesOrchestrator` - entry point, one call per user message
//! - `LlmClient` - pluggable trait for Gemini/OpenAI-compatible/Ollama
//! - `SpecialistAgent` - system prompt plus tool registry
//!
//! # Determinism
//!
//! Prices, discounts, stock and order state come from the tools. The model
//! only picks which tool to call and phrases the reply, and every node keeps
//! working when the model is unavailable.

pub mod errors;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod specialists;
pub mod tools;

pub use errors::AgentError;
pub use llm::{build_client, LlmClient, LlmError, LlmRequest, OfflineLlmClient, ScriptedLlmClient};
pub use orchestrator::{CartUpdate, ChatInput, ChatTurn, SalesOrchestrator};
pub use specialists::{SpecialistAgent, SpecialistRun};
pub use tools::{Tool, ToolError, ToolRegistry};
