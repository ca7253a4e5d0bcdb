use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use shopwise_db::RepositoryError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("could not serialize output of `{tool}`: {message}")]
    Serialization { tool: String, message: String },
}

impl From<RepositoryError> for ToolError {
    fn from(error: RepositoryError) -> Self {
        Self::Storage(error.to_string())
    }
}

/// What a specialist prompt advertises for one tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON-schema style object describing the accepted arguments.
    fn parameters(&self) -> Value;
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn with<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.register(tool);
        self
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .values()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn execute(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(arguments).await
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Decodes tool arguments. A missing (`null`) argument object is treated as
/// empty so tools whose fields are all optional can be called bare.
pub fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|error| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: error.to_string(),
    })
}

pub fn to_output<T: Serialize>(tool: &str, output: &T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|error| ToolError::Serialization {
        tool: tool.to_string(),
        message: error.to_string(),
    })
}

/// Builds an object schema from `(name, type, description)` triples. Names
/// listed in `required` are marked as such.
pub fn object_schema(properties: &[(&str, &str, &str)], required: &[&str]) -> Value {
    let properties: Map<String, Value> = properties
        .iter()
        .map(|(name, kind, description)| {
            ((*name).to_string(), json!({ "type": kind, "description": description }))
        })
        .collect();
    json!({ "type": "object", "properties": properties, "required": required })
}

/// Declares a tool struct that decodes its arguments into `$args` and
/// forwards to `$method` on a shared context.
macro_rules! tool {
    (
        $(#[$meta:meta])*
        $ty:ident on $ctx:ty {
            name: $name:literal,
            description: $description:literal,
            parameters: $parameters:expr,
            call: $method:ident($args:ty) $(,)?
        }
    ) => {
        $(#[$meta])*
        pub struct $ty(pub ::std::sync::Arc<$ctx>);

        #[::async_trait::async_trait]
        impl $crate::tools::Tool for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn description(&self) -> &'static str {
                $description
            }

            fn parameters(&self) -> ::serde_json::Value {
                $parameters
            }

            async fn execute(
                &self,
                arguments: ::serde_json::Value,
            ) -> Result<::serde_json::Value, $crate::tools::ToolError> {
                let args: $args = $crate::tools::parse_arguments($name, arguments)?;
                let output = self.0.$method(args).await?;
                $crate::tools::to_output($name, &output)
            }
        }
    };
}

pub(crate) use tool;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::{object_schema, parse_arguments, ToolError, ToolRegistry};

    struct Counter {
        step: u32,
    }

    #[derive(Deserialize)]
    struct AddArgs {
        value: u32,
        #[serde(default)]
        times: Option<u32>,
    }

    #[derive(Serialize)]
    struct AddOutput {
        total: u32,
    }

    impl Counter {
        async fn add(&self, args: AddArgs) -> Result<AddOutput, ToolError> {
            Ok(AddOutput { total: args.value + self.step * args.times.unwrap_or(1) })
        }
    }

    tool! {
        AddTool on Counter {
            name: "add",
            description: "Adds the configured step to a value.",
            parameters: object_schema(&[("value", "integer", "Starting value")], &["value"]),
            call: add(AddArgs),
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() -> Result<(), String> {
        let registry = ToolRegistry::default().with(AddTool(Arc::new(Counter { step: 5 })));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names(), vec!["add"]);
        let output = registry
            .execute("add", json!({ "value": 1, "times": 2 }))
            .await
            .map_err(|e| e.to_string())?;
        assert_eq!(output, json!({ "total": 11 }));

        let specs = registry.specs();
        assert_eq!(specs[0].parameters["required"], json!(["value"]));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_tools_and_bad_arguments_are_errors() {
        let registry = ToolRegistry::default().with(AddTool(Arc::new(Counter { step: 1 })));

        assert!(matches!(
            registry.execute("subtract", json!({})).await,
            Err(ToolError::UnknownTool(name)) if name == "subtract"
        ));
        assert!(matches!(
            registry.execute("add", json!({ "value": "seven" })).await,
            Err(ToolError::InvalidArguments { tool, .. }) if tool == "add"
        ));
    }

    #[test]
    fn null_arguments_decode_as_empty_object() {
        #[derive(Deserialize)]
        struct Optional {
            #[serde(default)]
            limit: Option<u32>,
        }
        let parsed: Result<Optional, _> = parse_arguments("list", serde_json::Value::Null);
        assert!(matches!(parsed, Ok(Optional { limit: None })));
    }
}
