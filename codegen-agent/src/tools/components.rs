//! Design-system documentation tools.
//!
//! Each component is documented by one markdown file in the components
//! directory, optionally opening with a `---` frontmatter block that carries
//! `title:` and `description:` lines.

use super::{FieldType, InputSchema, ToolError, ToolFuture, ToolInfo, ToolTrait};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    pub title: String,
    pub description: String,
}

impl ComponentMetadata {
    fn placeholder(name: &str, description: &str) -> Self {
        Self {
            title: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Component names (file stems of `*.md` files), sorted.
pub async fn available_components(dir: &Path) -> Result<Vec<String>, ToolError> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

pub fn parse_frontmatter(name: &str, content: &str) -> ComponentMetadata {
    let mut lines = content.lines();

    if lines.next().map(str::trim) != Some("---") {
        return ComponentMetadata::placeholder(name, "No description available");
    }

    let mut metadata = ComponentMetadata::placeholder(name, "No description available");
    for line in lines.map(str::trim) {
        if line == "---" {
            break;
        }
        if let Some(title) = line.strip_prefix("title:") {
            metadata.title = title.trim().to_string();
        } else if let Some(description) = line.strip_prefix("description:") {
            metadata.description = description.trim().to_string();
        }
    }

    metadata
}

fn doc_path(dir: &Path, name: &str) -> Result<PathBuf, ToolError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(ToolError::InvalidArguments(format!(
            "invalid component name '{}'",
            name
        )));
    }
    Ok(dir.join(format!("{}.md", name.to_lowercase())))
}

pub async fn component_metadata(dir: &Path, name: &str) -> Result<ComponentMetadata, ToolError> {
    let path = doc_path(dir, name)?;
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(parse_frontmatter(name, &content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ComponentMetadata::placeholder(name, "Component not found"))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn component_docs(dir: &Path, name: &str) -> Result<String, ToolError> {
    let path = doc_path(dir, name)?;
    let name = name.trim();
    match tokio::fs::read_to_string(&path).await {
        Ok(content) if content.is_empty() => {
            Ok(format!("Empty documentation file for component: {}", name))
        }
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(format!("Documentation not found for component: {}", name))
        }
        Err(e) => Err(e.into()),
    }
}

pub struct ComponentMetadataTool {
    components_dir: PathBuf,
}

impl ComponentMetadataTool {
    pub fn new(components_dir: PathBuf) -> Self {
        Self { components_dir }
    }
}

impl ToolTrait for ComponentMetadataTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: "get_component_metadata".to_string(),
            description: "Gets metadata (title and description) for all components. Use this FIRST to decide which components are relevant.".to_string(),
            schema: InputSchema::new(),
        }
    }

    fn execute(&self, _arguments: Value) -> ToolFuture {
        let dir = self.components_dir.clone();
        Box::pin(async move {
            info!(dir = %dir.display(), "reading component metadata");

            let mut metadata = BTreeMap::new();
            for name in available_components(&dir).await? {
                let meta = component_metadata(&dir, &name).await?;
                metadata.insert(name, meta);
            }

            serde_json::to_string_pretty(&metadata)
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
        })
    }
}

pub struct SelectComponentsTool;

impl ToolTrait for SelectComponentsTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: "select_components".to_string(),
            description: "After reading component metadata, use this to select which components you need for the task. This helps track which components to read fully.".to_string(),
            schema: InputSchema::new().required(
                "selectedComponents",
                FieldType::Array(Box::new(FieldType::String)),
                "Array of component names that are relevant for the task",
            ),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture {
        Box::pin(async move {
            let selected: Vec<&str> = arguments
                .get("selectedComponents")
                .and_then(|v| v.as_array())
                .ok_or_else(|| ToolError::InvalidArguments("selectedComponents is required".to_string()))?
                .iter()
                .filter_map(|v| v.as_str())
                .collect();

            info!(components = %selected.join(", "), "components selected");

            Ok(format!(
                "You have selected: {}. Now proceed to get full documentation for these components only.",
                selected.join(", ")
            ))
        })
    }
}

pub struct ComponentDocsTool {
    components_dir: PathBuf,
}

impl ComponentDocsTool {
    pub fn new(components_dir: PathBuf) -> Self {
        Self { components_dir }
    }
}

impl ToolTrait for ComponentDocsTool {
    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: "get_component_docs".to_string(),
            description: "Gets full documentation for a specific component. Use this ONLY after selecting components based on metadata.".to_string(),
            schema: InputSchema::new().required(
                "componentName",
                FieldType::String,
                "The name of the component without .md extension",
            ),
        }
    }

    fn execute(&self, arguments: Value) -> ToolFuture {
        let dir = self.components_dir.clone();
        Box::pin(async move {
            let name = arguments
                .get("componentName")
                .and_then(|v| v.as_str())
                .ok_or_else(|| ToolError::InvalidArguments("componentName is required".to_string()))?;

            info!(component = %name, "reading component documentation");
            component_docs(&dir, name).await
        })
    }
}
