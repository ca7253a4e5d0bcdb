use thiserror::Error;

use shopwise_db::RepositoryError;

use crate::llm::LlmError;
use crate::tools::ToolError;

/// Anything that can stop an agent turn before it produces a reply.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] tera::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
