//! LLM-backed specialists, each owning one slice of the retail tool set.
//!
//! The model drives a prompt-level tool loop: every turn it answers with a
//! single JSON object that either calls a tool or replies to the customer.
//! The deterministic tool contexts are public so the orchestrator can call
//! them directly when the model is unavailable.

pub mod fulfillment;
pub mod inventory;
pub mod loyalty;
pub mod payment;
pub mod post_purchase;
pub mod recommendation;

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shopwise_core::domain::conversation::ChatMessage;

use crate::errors::AgentError;
use crate::llm::{complete_json, LlmClient, LlmRequest};
use crate::prompts::PromptLibrary;
use crate::tools::{ToolError, ToolRegistry};

/// One turn of the model's side of the tool protocol.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentStep {
    Call {
        tool: String,
        #[serde(default)]
        arguments: Value,
    },
    Reply {
        reply: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    pub arguments: Value,
    pub output: Value,
    pub is_error: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpecialistRun {
    pub reply: String,
    pub invocations: Vec<ToolInvocation>,
}

impl SpecialistRun {
    /// Output of the most recent successful call to `tool`.
    pub fn last_output(&self, tool: &str) -> Option<&Value> {
        self.invocations
            .iter()
            .rev()
            .find(|invocation| invocation.tool == tool && !invocation.is_error)
            .map(|invocation| &invocation.output)
    }
}

pub struct SpecialistAgent {
    name: &'static str,
    system_prompt: String,
    tools: ToolRegistry,
    llm: Arc<dyn LlmClient>,
    max_iterations: u32,
}

impl SpecialistAgent {
    pub fn new(
        name: &'static str,
        role: &str,
        tools: ToolRegistry,
        llm: Arc<dyn LlmClient>,
        prompts: &PromptLibrary,
        max_iterations: u32,
    ) -> Result<Self, AgentError> {
        let system_prompt = prompts.specialist(role, &tools.specs())?;
        Ok(Self { name, system_prompt, tools, llm, max_iterations: max_iterations.max(1) })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Calls one tool without involving the model.
    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        self.tools.execute(tool, arguments).await
    }

    /// Runs the tool loop for one request. Tool failures are fed back to the
    /// model as `{"error": ...}` outputs. Once tools have run, a model failure
    /// or the iteration cap ends the loop with a summary of the last output.
    pub async fn run(&self, user_message: &str) -> Result<SpecialistRun, AgentError> {
        let mut messages = vec![ChatMessage::user(user_message)];
        let mut invocations: Vec<ToolInvocation> = Vec::new();

        for iteration in 0..self.max_iterations {
            let request =
                LlmRequest::new(self.system_prompt.clone()).with_messages(messages.clone()).json();
            let step: AgentStep = match complete_json(self.llm.as_ref(), &request).await {
                Ok(step) => step,
                Err(error) if !invocations.is_empty() => {
                    warn!(
                        event_name = "agent.specialist.llm_failed",
                        specialist = self.name,
                        iteration,
                        error = %error,
                        "model failed mid-run, summarising tool output"
                    );
                    break;
                }
                Err(error) => return Err(error.into()),
            };

            match step {
                AgentStep::Reply { reply } => {
                    debug!(
                        event_name = "agent.specialist.replied",
                        specialist = self.name,
                        iteration,
                        tool_calls = invocations.len(),
                        "specialist produced a reply"
                    );
                    return Ok(SpecialistRun { reply, invocations });
                }
                AgentStep::Call { tool, arguments } => {
                    let (output, is_error) = match self.tools.execute(&tool, arguments.clone()).await
                    {
                        Ok(output) => (output, false),
                        Err(error) => {
                            warn!(
                                event_name = "agent.specialist.tool_failed",
                                specialist = self.name,
                                tool = %tool,
                                error = %error,
                                "tool call failed"
                            );
                            (json!({ "error": error.to_string() }), true)
                        }
                    };
                    debug!(
                        event_name = "agent.specialist.tool_called",
                        specialist = self.name,
                        tool = %tool,
                        is_error,
                        "tool executed"
                    );

                    messages.push(ChatMessage::assistant(
                        json!({ "tool": tool, "arguments": arguments }).to_string(),
                    ));
                    messages.push(ChatMessage::tool(
                        json!({ "tool": tool, "output": output }).to_string(),
                    ));
                    invocations.push(ToolInvocation { tool, arguments, output, is_error });
                }
            }
        }

        Ok(SpecialistRun { reply: summarize(invocations.last()), invocations })
    }
}

/// Reply used when the loop ends without the model answering. Tool outputs
/// carrying a `message` field are shown as-is.
fn summarize(last: Option<&ToolInvocation>) -> String {
    let Some(invocation) = last else {
        return "I wasn't able to complete that request.".to_string();
    };
    if let Some(message) = invocation.output.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    if invocation.is_error {
        return "Sorry, something went wrong while looking that up.".to_string();
    }
    let pretty = serde_json::to_string_pretty(&invocation.output)
        .unwrap_or_else(|_| invocation.output.to_string());
    format!("Here's what I found:\n```json\n{pretty}\n```")
}

/// Reads the `message` field tool outputs carry for direct display.
pub fn output_message(output: &Value) -> Option<&str> {
    output.get("message").and_then(Value::as_str)
}
