use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::error;

use crate::adapters::{AdapterError, AdapterRegistry, AdapterRequest, ErrorBehavior, INLINE_QUERY_PREFIX};
use crate::settings::{ItemSettings, ScriptKind, Settings, ToolbarSettings};

// ── Collaborators ──────────────────────────────────────────────────────────

/// The note a template is resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    /// File name without extension.
    pub basename: String,
    /// Vault-relative path, `/`-separated.
    pub path: String,
}

impl NoteFile {
    pub fn new(path: &str) -> Self {
        let basename = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path)
            .to_string();
        Self {
            basename,
            path: path.to_string(),
        }
    }
}

/// What the host knows about the current editor session.
pub trait NoteContext: Send + Sync {
    fn selection(&self) -> Option<String>;

    /// Absolute vault root, when the vault lives on a filesystem.
    fn vault_path(&self) -> Option<PathBuf>;

    /// Current frontmatter of `file`; read on every resolution.
    fn frontmatter(&self, file: &NoteFile) -> Option<Map<String, Value>>;

    /// Show an error to the user where the resolved text would appear.
    fn display_error(&self, message: &str);
}

/// A [`NoteContext`] backed by plain values. Displayed errors are collected.
#[derive(Debug, Default)]
pub struct MemoryContext {
    pub selection: Option<String>,
    pub vault_path: Option<PathBuf>,
    pub frontmatter: HashMap<String, Map<String, Value>>,
    displayed: Mutex<Vec<String>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(mut self, selection: Option<String>) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_vault_path(mut self, vault_path: Option<PathBuf>) -> Self {
        self.vault_path = vault_path;
        self
    }

    pub fn with_frontmatter(mut self, file: &NoteFile, frontmatter: Map<String, Value>) -> Self {
        self.frontmatter.insert(file.path.clone(), frontmatter);
        self
    }

    pub fn displayed_errors(&self) -> Vec<String> {
        self.displayed
            .lock()
            .map(|errors| errors.clone())
            .unwrap_or_default()
    }
}

impl NoteContext for MemoryContext {
    fn selection(&self) -> Option<String> {
        self.selection.clone()
    }

    fn vault_path(&self) -> Option<PathBuf> {
        self.vault_path.clone()
    }

    fn frontmatter(&self, file: &NoteFile) -> Option<Map<String, Value>> {
        self.frontmatter.get(&file.path).cloned()
    }

    fn display_error(&self, message: &str) {
        if let Ok(mut errors) = self.displayed.lock() {
            errors.push(message.to_string());
        }
    }
}

// ── Patterns ───────────────────────────────────────────────────────────────

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{\{.*?\}\}").expect("placeholder pattern"))
}

fn property_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{(encode:)?prop_([^}]*)\}\}").expect("property pattern"))
}

fn wiki_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\[([^\]|]*)(?:\|[^\]]*)?\]\]").expect("wiki link pattern"))
}

/// Percent-encode like the host's `encodeURIComponent`, which leaves
/// `! ' ( ) *` unescaped.
fn encode_component(value: &str) -> String {
    let encoded = urlencoding::encode(value);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }
    encoded
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
        .replace("%2A", "*")
}

/// Replace `{{name}}` with `value` and `{{encode:name}}` with its
/// percent-encoded form.
fn substitute(template: &str, name: &str, value: &str) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    template
        .replace(&format!("{{{{encode:{}}}}}", name), &encode_component(value))
        .replace(&format!("{{{{{}}}}}", name), value)
}

/// Render a frontmatter value as text. Lists are comma-joined and wiki links
/// keep only their target (`[[Target|Alias]]` becomes `Target`).
fn property_text(value: &Value) -> String {
    let text = match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(values) => values.iter().map(property_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    };
    wiki_link_re().replace_all(&text, "$1").into_owned()
}

// ── Expression dispatch ────────────────────────────────────────────────────

/// A prefix/suffix pair marking a whole string as an adapter expression.
#[derive(Debug, Clone, PartialEq)]
struct ExpressionWrapper {
    kind: ScriptKind,
    prefix: String,
    suffix: &'static str,
}

impl ExpressionWrapper {
    fn new(kind: ScriptKind, prefix: &str, suffix: &'static str) -> Self {
        Self {
            kind,
            prefix: prefix.to_string(),
            suffix,
        }
    }

    fn matches(&self, trimmed: &str) -> bool {
        !self.prefix.is_empty() && trimmed.starts_with(&self.prefix)
    }

    fn strip<'a>(&self, trimmed: &'a str) -> &'a str {
        let inner = &trimmed[self.prefix.len()..];
        inner.strip_suffix(self.suffix).unwrap_or(inner).trim()
    }
}

// ── Resolver ───────────────────────────────────────────────────────────────

pub struct Resolver {
    context: Arc<dyn NoteContext>,
    adapters: AdapterRegistry,
    scripting_enabled: bool,
}

impl Resolver {
    pub fn new(context: Arc<dyn NoteContext>, adapters: AdapterRegistry, scripting_enabled: bool) -> Self {
        Self {
            context,
            adapters,
            scripting_enabled,
        }
    }

    pub fn for_settings(settings: &Settings, context: Arc<dyn NoteContext>, adapters: AdapterRegistry) -> Self {
        Self::new(context, adapters, settings.scripting_enabled)
    }

    /// Wrappers in priority order; the first match claims the string.
    fn wrappers(&self) -> Vec<ExpressionWrapper> {
        let mut wrappers = vec![
            ExpressionWrapper::new(ScriptKind::JavaScript, "{{js:", "}}"),
            ExpressionWrapper::new(ScriptKind::Dataview, "{{dv:", "}}"),
        ];
        if let Some(prefix) = self
            .adapters
            .get(ScriptKind::Dataview)
            .and_then(|dv| dv.setting(INLINE_QUERY_PREFIX))
        {
            wrappers.push(ExpressionWrapper::new(ScriptKind::Dataview, &prefix, ""));
        }
        wrappers.extend([
            ExpressionWrapper::new(ScriptKind::JsEngine, "{{jse:", "}}"),
            ExpressionWrapper::new(ScriptKind::Templater, "<%", "%>"),
            ExpressionWrapper::new(ScriptKind::Templater, "{{tp:", "}}"),
        ]);
        wrappers
    }

    /// True when `s` needs resolving. Never evaluates anything.
    pub fn has_variables(&self, s: &str) -> bool {
        if placeholder_re().is_match(s) {
            return true;
        }
        if !self.scripting_enabled {
            return false;
        }
        let trimmed = s.trim();
        self.wrappers()
            .iter()
            .any(|w| self.adapters.is_active(w.kind) && w.matches(trimmed))
    }

    /// Substitute variables in `template`, then hand the whole string to an
    /// adapter if it is an expression. Missing data resolves to nothing;
    /// adapter failures resolve to an empty string.
    pub async fn resolve(&self, template: &str, file: Option<&NoteFile>, on_error: ErrorBehavior) -> String {
        let selection = self.context.selection().unwrap_or_default();
        let mut s = substitute(template, "selection", &selection);

        if let Some(file) = file {
            s = substitute(&s, "note_title", &file.basename);
            s = substitute(&s, "file_path", &file.path);
        }
        if let Some(vault) = self.context.vault_path() {
            s = substitute(&s, "vault_path", &vault.to_string_lossy());
        }
        if let Some(file) = file {
            s = self.substitute_properties(&s, file);
        }

        if self.scripting_enabled {
            let trimmed = s.trim();
            if let Some(wrapper) = self.wrappers().into_iter().find(|w| w.matches(trimmed)) {
                let expression = wrapper.strip(trimmed).to_string();
                return self.evaluate_inline(wrapper.kind, &expression, file, on_error).await;
            }
        }
        s
    }

    fn substitute_properties(&self, s: &str, file: &NoteFile) -> String {
        if !property_re().is_match(s) {
            return s.to_string();
        }
        let frontmatter = self.context.frontmatter(file).unwrap_or_default();
        property_re()
            .replace_all(s, |caps: &Captures| {
                let value = frontmatter
                    .get(caps[2].trim())
                    .map(property_text)
                    .unwrap_or_default();
                if caps.get(1).is_some() {
                    encode_component(&value)
                } else {
                    value
                }
            })
            .into_owned()
    }

    async fn evaluate_inline(
        &self,
        kind: ScriptKind,
        expression: &str,
        file: Option<&NoteFile>,
        on_error: ErrorBehavior,
    ) -> String {
        let mut request = AdapterRequest::evaluate_inline(expression, on_error);
        request.note_path = file.map(|f| f.path.clone());

        match self.adapters.call(kind, request).await {
            Ok(Value::String(text)) => text,
            Ok(_) => {
                self.surface(&AdapterError::NotText { adapter: kind }, on_error);
                String::new()
            }
            Err(err) => {
                self.surface(&err, on_error);
                String::new()
            }
        }
    }

    fn surface(&self, err: &AdapterError, on_error: ErrorBehavior) {
        match on_error {
            ErrorBehavior::Display => self.context.display_error(&err.to_string()),
            ErrorBehavior::Report => error!(error = %err, "script evaluation failed"),
            ErrorBehavior::Ignore => {}
        }
    }

    /// Resolve every item label, in item order.
    pub async fn resolve_all_labels(&self, toolbar: &ToolbarSettings, file: Option<&NoteFile>) -> Vec<String> {
        let mut labels = Vec::with_capacity(toolbar.items.len());
        for item in &toolbar.items {
            labels.push(self.resolve(&item.label, file, ErrorBehavior::Report).await);
        }
        labels
    }

    /// Whether any item's label, tooltip or link needs resolving, i.e. the
    /// toolbar must be re-rendered whenever a note is opened.
    pub fn toolbar_uses_variables(&self, toolbar: &ToolbarSettings) -> bool {
        toolbar.items.iter().any(|item| {
            let text = [item.label.as_str(), item.tooltip.as_str(), item.link.as_str()].join(" ");
            self.has_variables(&text)
        })
    }

    /// Run a script item through its adapter. `None` for items that aren't
    /// scripts; failures resolve to an empty string.
    pub async fn execute_script_item(
        &self,
        item: &ItemSettings,
        file: Option<&NoteFile>,
        on_error: ErrorBehavior,
    ) -> Option<String> {
        let kind = item.item_type().script_kind()?;
        let config = item.script_config()?;

        let source_args = match config.source_args.as_deref() {
            Some(args) => Some(self.resolve(args, file, on_error).await),
            None => None,
        };
        let request = AdapterRequest {
            function: config.plugin_function.clone(),
            expression: config.expression.clone(),
            source_file: config.source_file.clone(),
            source_args,
            output_container: config.output_container.clone(),
            note_path: file.map(|f| f.path.clone()),
            error_behavior: on_error,
        };

        let output = match self.adapters.call(kind, request).await {
            Ok(Value::String(text)) => text,
            Ok(_) => String::new(),
            Err(err) => {
                self.surface(&err, on_error);
                String::new()
            }
        };
        Some(output)
    }
}
