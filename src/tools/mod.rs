//! Tools the generative model can invoke, and their registry.

mod outline_tool;
mod search_tool;

pub use outline_tool::OutlineTool;
pub use search_tool::SearchTool;

use crate::error::{PensumError, Result};
use crate::search::SourceTracker;
use async_openai::types::ChatCompletionTool;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// A tool exposed to the generative model.
///
/// Implementations return the formatted text block fed back to the model.
/// The tracker is request-scoped and records citations for whatever sources
/// the invocation touched.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model dispatches on.
    fn name(&self) -> &'static str;

    /// OpenAI tool schema.
    fn definition(&self) -> ChatCompletionTool;

    /// Execute with parsed JSON arguments.
    async fn execute(
        &self,
        args: &serde_json::Value,
        sources: &mut SourceTracker,
    ) -> Result<String>;
}

/// Registry mapping tool names to implementations.
///
/// Registration happens once at startup; dispatch is an explicit lookup that
/// fails loudly on a missing key. A BTreeMap keeps the schema order the
/// model sees deterministic.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    /// Schemas for every registered tool.
    pub fn definitions(&self) -> Vec<ChatCompletionTool> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Dispatch by name. An unknown name is a protocol violation by the
    /// model integration, not a user-facing condition.
    pub async fn execute(
        &self,
        name: &str,
        args: &serde_json::Value,
        sources: &mut SourceTracker,
    ) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| PensumError::ToolDispatch(name.to_string()))?;

        info!("Executing tool '{}'", name);
        tool.execute(args, sources).await
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
