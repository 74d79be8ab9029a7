//! The tool catalog: every capability the model may invoke, with the
//! schema used to describe it in the system prompt.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::CatalogError;
use crate::tools::{ToolArgs, ToolContext, ToolOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ToolParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Value used when an optional argument is omitted, as shown to the model.
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl ToolParam {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ParamKind,
        default: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            description,
        }
    }
}

/// The callable behind a tool.
///
/// Any `Fn(ToolArgs, ToolContext) -> impl Future<Output = Result<ToolOutput>>`
/// is a handler, so plain `async fn`s register directly.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolArgs, ToolContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutput>> + Send + 'static,
{
    async fn call(&self, args: ToolArgs, ctx: ToolContext) -> Result<ToolOutput> {
        (self)(args, ctx).await
    }
}

#[derive(Clone)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ToolParam>,
    /// The session passes its working directory to tools that set this.
    pub needs_working_directory: bool,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("needs_working_directory", &self.needs_working_directory)
            .finish_non_exhaustive()
    }
}

impl Tool {
    pub fn new(name: &'static str, description: &'static str, handler: impl ToolHandler + 'static) -> Self {
        Self {
            name,
            description,
            params: Vec::new(),
            needs_working_directory: false,
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: ToolParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_working_directory(mut self) -> Self {
        self.needs_working_directory = true;
        self
    }

    /// `- name(arg: type, arg2: type): description`
    pub fn describe(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.kind))
            .collect::<Vec<_>>()
            .join(", ");
        format!("- {}({}): {}", self.name, params, self.description)
    }
}

/// Name-indexed tools, in registration order.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding every built-in tool.
    pub fn with_default_tools() -> Self {
        let mut catalog = Self::new();
        for tool in crate::tool_definitions::default_tools() {
            // built-in names are unique
            let _ = catalog.register(tool);
        }
        catalog
    }

    pub fn register(&mut self, tool: Tool) -> Result<(), CatalogError> {
        if self.index.contains_key(tool.name) {
            return Err(CatalogError::DuplicateName(tool.name.to_string()));
        }
        self.index.insert(tool.name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One line per tool, in registration order.
    pub fn describe_all(&self) -> String {
        self.tools
            .iter()
            .map(Tool::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Instructions telling the model how to call tools, followed by the
    /// tool listing. Empty when there are no tools.
    pub fn tool_prompt(&self) -> String {
        if self.tools.is_empty() {
            return String::new();
        }
        format!(
            "You have access to the following tools. When you need to use a tool, \
             respond ONLY with a single JSON object with two keys: 'tool_name' and 'arguments'.\n\
             The 'arguments' key should contain an object with the required parameters.\n\n\
             Available Tools:\n{}",
            self.describe_all()
        )
    }
}
