use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::settings::ScriptKind;

/// Adapter function used for inline `{{js: ...}}`-style expressions.
pub const EVALUATE_INLINE: &str = "evaluateInline";

/// Adapter setting holding the Dataview inline query prefix (e.g. `=`).
pub const INLINE_QUERY_PREFIX: &str = "inlineQueryPrefix";

/// How adapter failures reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorBehavior {
    /// Show the error inline where the result would appear.
    Display,
    /// Log it; nothing is shown.
    #[default]
    Report,
    /// Drop it.
    Ignore,
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("{0} is not available")]
    Unavailable(ScriptKind),

    #[error("{adapter} does not support '{function}'")]
    UnsupportedFunction { adapter: ScriptKind, function: String },

    #[error("{adapter} failed: {message}")]
    Evaluation { adapter: ScriptKind, message: String },

    #[error("{adapter} returned a non-text result")]
    NotText { adapter: ScriptKind },
}

/// One call into an adapter. Fields a function doesn't use stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRequest {
    pub function: String,
    pub expression: Option<String>,
    pub source_file: Option<String>,
    pub source_args: Option<String>,
    pub output_container: Option<String>,
    /// Path of the note the call is made for.
    pub note_path: Option<String>,
    pub error_behavior: ErrorBehavior,
}

impl AdapterRequest {
    pub fn evaluate_inline(expression: &str, error_behavior: ErrorBehavior) -> Self {
        Self {
            function: EVALUATE_INLINE.to_string(),
            expression: Some(expression.to_string()),
            source_file: None,
            source_args: None,
            output_container: None,
            note_path: None,
            error_behavior,
        }
    }
}

/// A pluggable evaluator for one scripting ecosystem.
#[async_trait]
pub trait ScriptAdapter: Send + Sync {
    /// Named configuration value, e.g. [`INLINE_QUERY_PREFIX`].
    fn setting(&self, _name: &str) -> Option<String> {
        None
    }

    async fn use_adapter(&self, request: AdapterRequest) -> Result<Value, AdapterError>;
}

#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ScriptKind, Arc<dyn ScriptAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ScriptKind, adapter: Arc<dyn ScriptAdapter>) {
        self.adapters.insert(kind, adapter);
    }

    pub fn get(&self, kind: ScriptKind) -> Option<&Arc<dyn ScriptAdapter>> {
        self.adapters.get(&kind)
    }

    pub fn is_active(&self, kind: ScriptKind) -> bool {
        self.adapters.contains_key(&kind)
    }

    /// Dispatch a request, turning a missing adapter into an error.
    pub async fn call(&self, kind: ScriptKind, request: AdapterRequest) -> Result<Value, AdapterError> {
        let adapter = self.get(kind).ok_or(AdapterError::Unavailable(kind))?;
        adapter.use_adapter(request).await
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.adapters.keys()).finish()
    }
}
