pub mod components;
pub mod schema;
pub mod weather;

use crate::clients::ToolDefinition;
use crate::config::Profile;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub use components::{ComponentDocsTool, ComponentMetadataTool, SelectComponentsTool};
pub use schema::{FieldSpec, FieldType, InputSchema};
pub use weather::WeatherTool;

/// Failure raised by a tool handler itself.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for ToolError {
    fn from(error: std::io::Error) -> Self {
        ToolError::IoError(error.to_string())
    }
}

/// Failure of a registry operation, with handler errors already normalized.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments for {tool}: {reason}")]
    Schema { tool: String, reason: String },
    #[error("Tool {tool} failed: {cause}")]
    Execution { tool: String, cause: String },
}

impl RegistryError {
    /// Unknown tools and malformed arguments both mean the model asked for
    /// something the registry cannot accept.
    pub fn is_schema_error(&self) -> bool {
        matches!(self, RegistryError::UnknownTool(_) | RegistryError::Schema { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: InputSchema,
}

pub type ToolFuture = BoxFuture<'static, Result<String, ToolError>>;

type Handler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

pub trait ToolTrait: Send + Sync {
    fn info(&self) -> ToolInfo;
    fn execute(&self, arguments: Value) -> ToolFuture;
}

/// A named capability together with its argument schema and async handler.
#[derive(Clone)]
pub struct ToolSpec {
    info: ToolInfo,
    handler: Handler,
}

impl ToolSpec {
    pub fn new<F, Fut>(name: &str, description: &str, schema: InputSchema, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        Self {
            info: ToolInfo {
                name: name.to_string(),
                description: description.to_string(),
                schema,
            },
            handler: Arc::new(move |arguments| handler(arguments).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }
}

impl<T: ToolTrait + 'static> From<T> for ToolSpec {
    fn from(tool: T) -> Self {
        let info = tool.info();
        let tool = Arc::new(tool);
        Self {
            info,
            handler: Arc::new(move |arguments| tool.execute(arguments)),
        }
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec").field("info", &self.info).finish_non_exhaustive()
    }
}

/// Handle to a tool that has been checked against a registry.
///
/// Only [`ToolRegistry::resolve`] hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolId(usize);

/// Read-only after startup; shared between runs behind an `Arc`.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, ToolId>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: impl Into<ToolSpec>) -> Result<ToolId, RegistryError> {
        let spec = spec.into();
        if self.index.contains_key(spec.name()) {
            return Err(RegistryError::DuplicateTool(spec.name().to_string()));
        }

        let id = ToolId(self.tools.len());
        self.index.insert(spec.name().to_string(), id);
        self.tools.push(spec);
        Ok(id)
    }

    pub fn resolve(&self, name: &str) -> Result<ToolId, RegistryError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    pub fn get(&self, id: ToolId) -> Option<&ToolSpec> {
        self.tools.get(id.0)
    }

    /// Validates `arguments` and runs the handler.
    ///
    /// Handler failures (including panics) come back as [`RegistryError`]
    /// values; nothing escapes as a panic.
    pub async fn invoke(&self, id: ToolId, arguments: Value) -> Result<String, RegistryError> {
        let spec = self
            .get(id)
            .ok_or_else(|| RegistryError::UnknownTool(format!("#{}", id.0)))?;
        let tool = spec.name().to_string();

        spec.info
            .schema
            .validate(&arguments)
            .map_err(|reason| RegistryError::Schema {
                tool: tool.clone(),
                reason,
            })?;

        debug!(tool = %tool, "invoking tool handler");

        // The handler is called inside the guarded future so panics raised
        // before it returns its own future are caught too.
        let handler = Arc::clone(&spec.handler);
        let guarded = AssertUnwindSafe(async move { handler(arguments).await });

        match guarded.catch_unwind().await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(ToolError::InvalidArguments(reason))) => Err(RegistryError::Schema { tool, reason }),
            Ok(Err(error)) => Err(RegistryError::Execution {
                tool,
                cause: error.to_string(),
            }),
            Err(_) => Err(RegistryError::Execution {
                tool,
                cause: "handler panicked".to_string(),
            }),
        }
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Result<String, RegistryError> {
        let id = self.resolve(name)?;
        self.invoke(id, arguments).await
    }

    pub fn list(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Provider-facing definitions, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.info.name.clone(),
                description: tool.info.description.clone(),
                parameters: tool.info.schema.to_json_schema(),
            })
            .collect()
    }
}

/// Builds the tool set a profile runs with.
pub fn toolset(profile: Profile, components_dir: PathBuf) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    match profile {
        Profile::Codegen => {
            registry.register(WeatherTool)?;
        }
        Profile::DesignSystem => {
            registry.register(ComponentMetadataTool::new(components_dir.clone()))?;
            registry.register(SelectComponentsTool)?;
            registry.register(ComponentDocsTool::new(components_dir))?;
        }
        Profile::Plain => {}
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo_spec(name: &str) -> ToolSpec {
        ToolSpec::new(
            name,
            "Echo the text back",
            InputSchema::new().required("text", FieldType::String, "Text to echo"),
            |arguments: Value| async move {
                Ok(arguments["text"].as_str().unwrap_or_default().to_string())
            },
        )
    }

    #[test]
    fn test_register_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("echo")).unwrap();

        let err = registry.register(echo_spec("echo")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.resolve("missing").unwrap_err();

        assert_eq!(err, RegistryError::UnknownTool("missing".to_string()));
        assert!(err.is_schema_error());
    }

    #[tokio::test]
    async fn test_call_runs_handler() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("echo")).unwrap();

        let output = registry.call("echo", json!({"text": "hi"})).await.unwrap();
        assert_eq!(output, "hi");
    }

    #[tokio::test]
    async fn test_schema_failure_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new(
                "count",
                "",
                InputSchema::new().required("n", FieldType::Integer, ""),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(String::new()) }
                },
            ))
            .unwrap();

        let err = registry.call("count", json!({"n": "one"})).await.unwrap_err();

        assert!(matches!(err, RegistryError::Schema { ref tool, .. } if tool == "count"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_errors_are_normalized() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("broken", "", InputSchema::new(), |_| async {
                Err(ToolError::ExecutionFailed("upstream timed out".to_string()))
            }))
            .unwrap();
        registry
            .register(ToolSpec::new("picky", "", InputSchema::new(), |_| async {
                Err(ToolError::InvalidArguments("bad city".to_string()))
            }))
            .unwrap();

        let err = registry.call("broken", json!({})).await.unwrap_err();
        assert_eq!(
            err,
            RegistryError::Execution {
                tool: "broken".to_string(),
                cause: "Execution failed: upstream timed out".to_string(),
            }
        );
        assert!(!err.is_schema_error());

        let err = registry.call("picky", json!({})).await.unwrap_err();
        assert!(err.is_schema_error());
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_execution_error() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("panics", "", InputSchema::new(), |_| async {
                if true {
                    panic!("boom");
                }
                Ok(String::new())
            }))
            .unwrap();

        let err = registry.call("panics", json!({})).await.unwrap_err();
        assert!(matches!(err, RegistryError::Execution { ref cause, .. } if cause == "handler panicked"));
    }

    struct EagerTool;

    impl ToolTrait for EagerTool {
        fn info(&self) -> ToolInfo {
            ToolInfo {
                name: "eager".to_string(),
                description: String::new(),
                schema: InputSchema::new(),
            }
        }

        fn execute(&self, arguments: Value) -> ToolFuture {
            let n = arguments["n"].as_u64().expect("n must be set");
            Box::pin(async move { Ok(n.to_string()) })
        }
    }

    #[tokio::test]
    async fn test_panic_before_future_is_built_becomes_execution_error() {
        let mut registry = ToolRegistry::new();
        registry
            .register(ToolSpec::new("closure", "", InputSchema::new(), |args: Value| {
                let n = args["n"].as_u64().expect("n must be set");
                async move { Ok(n.to_string()) }
            }))
            .unwrap();
        registry.register(EagerTool).unwrap();

        for name in ["closure", "eager"] {
            let err = registry.call(name, json!({})).await.unwrap_err();
            assert_eq!(
                err,
                RegistryError::Execution {
                    tool: name.to_string(),
                    cause: "handler panicked".to_string(),
                }
            );
        }

        assert_eq!(registry.call("eager", json!({"n": 7})).await.unwrap(), "7");
    }

    #[test]
    fn test_definitions_keep_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_spec("zeta")).unwrap();
        registry.register(echo_spec("alpha")).unwrap();

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(registry.definitions()[0].parameters["required"], json!(["text"]));
    }

    #[test]
    fn test_toolset_per_profile() {
        let dir = PathBuf::from("./src/components");

        assert_eq!(toolset(Profile::Codegen, dir.clone()).unwrap().list(), vec!["getWeather"]);
        assert_eq!(
            toolset(Profile::DesignSystem, dir.clone()).unwrap().list(),
            vec!["get_component_metadata", "select_components", "get_component_docs"]
        );
        assert!(toolset(Profile::Plain, dir).unwrap().is_empty());
    }
}
