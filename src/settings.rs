use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Current schema revision. Bumped exactly when a migration step is added.
pub const SETTINGS_VERSION: f64 = 20250313.1;

/// Frontmatter key that names a toolbar for a single note.
pub const DEFAULT_TOOLBAR_PROP: &str = "notetoolbar";

// ── Item types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ItemType {
    Break,
    Command,
    Dataview,
    File,
    Group,
    JavaScript,
    JsEngine,
    Menu,
    Separator,
    Spreader,
    Templater,
    #[default]
    Uri,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Break => "break",
            ItemType::Command => "command",
            ItemType::Dataview => "dataview",
            ItemType::File => "file",
            ItemType::Group => "group",
            ItemType::JavaScript => "javascript",
            ItemType::JsEngine => "js-engine",
            ItemType::Menu => "menu",
            ItemType::Separator => "separator",
            ItemType::Spreader => "spreader",
            ItemType::Templater => "templater-obsidian",
            ItemType::Uri => "uri",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim() {
            "break" => Ok(ItemType::Break),
            "command" => Ok(ItemType::Command),
            "dataview" => Ok(ItemType::Dataview),
            "file" => Ok(ItemType::File),
            "group" => Ok(ItemType::Group),
            "javascript" => Ok(ItemType::JavaScript),
            "js-engine" => Ok(ItemType::JsEngine),
            "menu" => Ok(ItemType::Menu),
            "separator" => Ok(ItemType::Separator),
            "spreader" => Ok(ItemType::Spreader),
            "templater-obsidian" => Ok(ItemType::Templater),
            "uri" => Ok(ItemType::Uri),
            _ => Err(format!("Invalid item type '{}'", s)),
        }
    }

    /// The adapter that evaluates this item, for script item types.
    pub fn script_kind(&self) -> Option<ScriptKind> {
        match self {
            ItemType::Dataview => Some(ScriptKind::Dataview),
            ItemType::JavaScript => Some(ScriptKind::JavaScript),
            ItemType::JsEngine => Some(ScriptKind::JsEngine),
            ItemType::Templater => Some(ScriptKind::Templater),
            _ => None,
        }
    }

    /// Group and menu items store a toolbar uuid in their link.
    pub fn references_toolbar(&self) -> bool {
        matches!(self, ItemType::Group | ItemType::Menu)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ItemType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ItemType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(ItemType::from_str(&s).unwrap_or_else(|err| {
            tracing::warn!("{}, loading it as a URI item", err);
            ItemType::Uri
        }))
    }
}

/// Embedded scripting ecosystems an item or expression can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Dataview,
    JavaScript,
    JsEngine,
    Templater,
}

impl ScriptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptKind::Dataview => "dataview",
            ScriptKind::JavaScript => "javascript",
            ScriptKind::JsEngine => "js-engine",
            ScriptKind::Templater => "templater-obsidian",
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Placement and visibility ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Desktop,
    Mobile,
    Tablet,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Desktop, Platform::Mobile, Platform::Tablet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Desktop => "desktop",
            Platform::Mobile => "mobile",
            Platform::Tablet => "tablet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionType {
    #[default]
    Props,
    Top,
    Fabl,
    Fabr,
    Hidden,
}

impl PositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionType::Props => "props",
            PositionType::Top => "top",
            PositionType::Fabl => "fabl",
            PositionType::Fabr => "fabr",
            PositionType::Hidden => "hidden",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Icon,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Editing,
    Reading,
    #[default]
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewPosition {
    #[serde(default)]
    pub position: PositionType,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPosition {
    #[serde(default)]
    pub all_views: ViewPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolbarPosition {
    #[serde(default)]
    pub desktop: PlatformPosition,
    #[serde(default)]
    pub mobile: PlatformPosition,
    #[serde(default)]
    pub tablet: PlatformPosition,
}

impl ToolbarPosition {
    pub fn for_platform(&self, platform: Platform) -> PositionType {
        match platform {
            Platform::Desktop => self.desktop.all_views.position,
            Platform::Mobile => self.mobile.all_views.position,
            Platform::Tablet => self.tablet.all_views.position,
        }
    }
}

fn default_components() -> Vec<ComponentType> {
    vec![ComponentType::Icon, ComponentType::Label]
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlatformVisibility {
    #[serde(default = "default_components")]
    pub components: Vec<ComponentType>,
}

impl Default for PlatformVisibility {
    fn default() -> Self {
        Self {
            components: default_components(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemVisibility {
    #[serde(default)]
    pub desktop: PlatformVisibility,
    #[serde(default)]
    pub mobile: PlatformVisibility,
    #[serde(default)]
    pub tablet: PlatformVisibility,
    /// Restricts the item to editing or reading view; absent means both.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<ViewMode>,
}

impl ItemVisibility {
    pub fn for_platform(&self, platform: Platform) -> &[ComponentType] {
        match platform {
            Platform::Desktop => &self.desktop.components,
            Platform::Mobile => &self.mobile.components,
            Platform::Tablet => &self.tablet.components,
        }
    }

    pub fn is_hidden_on(&self, platform: Platform) -> bool {
        self.for_platform(platform).is_empty()
    }
}

// ── Items ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkAttributes {
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
    #[serde(default)]
    pub has_vars: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command_id: String,
}

/// Script invocation details. Only meaningful for script item types.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptConfig {
    #[serde(default)]
    pub plugin_function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_container: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemSettings {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub tooltip: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub link_attr: LinkAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_config: Option<ScriptConfig>,
    #[serde(default)]
    pub visibility: ItemVisibility,
    #[serde(default)]
    pub in_gallery: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ItemSettings {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            link_attr: LinkAttributes {
                item_type,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.link_attr.item_type
    }

    /// The script sub-record, or `None` when the item type doesn't run scripts.
    pub fn script_config(&self) -> Option<&ScriptConfig> {
        self.item_type()
            .script_kind()
            .and(self.script_config.as_ref())
    }
}

// ── Toolbars ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarSettings {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<ItemSettings>,
    #[serde(default)]
    pub position: ToolbarPosition,
    #[serde(default)]
    pub default_styles: Vec<String>,
    #[serde(default)]
    pub mobile_styles: Vec<String>,
    #[serde(default)]
    pub updated: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolbarSettings {
    pub fn new(name: &str) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            default_styles: vec!["border".to_string(), "even".to_string(), "sticky".to_string()],
            updated: chrono::Utc::now().to_rfc3339(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FolderMapping {
    #[serde(default)]
    pub folder: String,
    /// Toolbar uuid. Empty when the mapping lost its toolbar during migration.
    #[serde(default)]
    pub toolbar: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Folder,
    Property,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// Property name; unused for folder conditions.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarRule {
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub conjunction: Conjunction,
    #[serde(default)]
    pub toolbar: String,
}

// ── Settings root ──────────────────────────────────────────────────────────

fn default_settings_version() -> f64 {
    SETTINGS_VERSION
}

fn default_true() -> bool {
    true
}

fn default_toolbar_prop() -> String {
    DEFAULT_TOOLBAR_PROP.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_settings_version")]
    pub version: f64,
    #[serde(default)]
    pub toolbars: Vec<ToolbarSettings>,
    #[serde(default)]
    pub folder_mappings: Vec<FolderMapping>,
    #[serde(default)]
    pub rules: Vec<ToolbarRule>,
    #[serde(default)]
    pub scripting_enabled: bool,
    #[serde(default = "default_true")]
    pub show_toolbar_in_file_menu: bool,
    #[serde(default)]
    pub show_edit_in_fab_menu: bool,
    #[serde(default = "default_toolbar_prop")]
    pub toolbar_prop: String,
    /// One-time prompts the user has already seen, keyed by prompt id.
    #[serde(default)]
    pub onboarding: BTreeMap<String, bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            toolbars: Vec::new(),
            folder_mappings: Vec::new(),
            rules: Vec::new(),
            scripting_enabled: false,
            show_toolbar_in_file_menu: true,
            show_edit_in_fab_menu: false,
            toolbar_prop: default_toolbar_prop(),
            onboarding: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    pub fn toolbar_by_uuid(&self, uuid: &str) -> Option<&ToolbarSettings> {
        if uuid.is_empty() {
            return None;
        }
        self.toolbars.iter().find(|tb| tb.uuid == uuid)
    }

    pub fn toolbar_by_name(&self, name: &str) -> Option<&ToolbarSettings> {
        self.toolbars.iter().find(|tb| tb.name == name)
    }

    pub fn item_by_uuid(&self, uuid: &str) -> Option<&ItemSettings> {
        if uuid.is_empty() {
            return None;
        }
        self.toolbars
            .iter()
            .flat_map(|tb| tb.items.iter())
            .find(|item| item.uuid == uuid)
    }

    /// Pick the toolbar for a note. A toolbar named in the note's properties
    /// wins, then the first matching rule, then the first matching folder
    /// mapping.
    pub fn select_toolbar(
        &self,
        file_path: &str,
        frontmatter: Option<&Map<String, Value>>,
    ) -> Option<&ToolbarSettings> {
        if let Some(name) = frontmatter
            .and_then(|fm| fm.get(&self.toolbar_prop))
            .and_then(Value::as_str)
        {
            if let Some(tb) = self.toolbar_by_name(name.trim()) {
                return Some(tb);
            }
        }

        for rule in &self.rules {
            if rule_matches(rule, file_path, frontmatter) {
                if let Some(tb) = self.toolbar_by_uuid(&rule.toolbar) {
                    return Some(tb);
                }
            }
        }

        self.folder_mappings
            .iter()
            .find(|mapping| folder_matches(&mapping.folder, file_path))
            .and_then(|mapping| self.toolbar_by_uuid(&mapping.toolbar))
    }
}

/// `*` matches every note, `/` matches notes at the vault root, anything else
/// matches notes in that folder or below it (case-insensitive).
pub fn folder_matches(pattern: &str, file_path: &str) -> bool {
    let pattern = pattern.trim();
    if pattern == "*" {
        return true;
    }

    let folder = file_path
        .rsplit_once('/')
        .map(|(folder, _)| folder)
        .unwrap_or("");
    if pattern == "/" {
        return folder.is_empty();
    }

    let pattern = pattern.trim_matches('/').to_lowercase();
    if pattern.is_empty() {
        return false;
    }
    let folder = folder.to_lowercase();
    folder == pattern || folder.starts_with(&format!("{}/", pattern))
}

fn rule_matches(rule: &ToolbarRule, file_path: &str, frontmatter: Option<&Map<String, Value>>) -> bool {
    if rule.conditions.is_empty() {
        return false;
    }
    let check = |cond: &RuleCondition| match cond.kind {
        ConditionKind::Folder => folder_matches(&cond.value, file_path),
        ConditionKind::Property => frontmatter
            .and_then(|fm| fm.get(&cond.key))
            .map_or(false, |value| property_has_value(value, &cond.value)),
    };
    match rule.conjunction {
        Conjunction::And => rule.conditions.iter().all(check),
        Conjunction::Or => rule.conditions.iter().any(check),
    }
}

fn property_has_value(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Array(values) => values.iter().any(|v| property_has_value(v, expected)),
        Value::Null => expected.is_empty(),
        other => other.to_string() == expected,
    }
}

// ── Validation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Check identifiers and cross-references after load.
pub fn validate_settings(settings: &Settings) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if settings.version != SETTINGS_VERSION {
        warnings.push(format!(
            "Settings version {} differs from current version {}",
            settings.version, SETTINGS_VERSION
        ));
    }

    let mut toolbar_ids = HashSet::new();
    let mut toolbar_names: HashMap<&str, usize> = HashMap::new();
    for (i, toolbar) in settings.toolbars.iter().enumerate() {
        if toolbar.uuid.is_empty() {
            errors.push(format!("Toolbar {} ('{}') has no uuid", i, toolbar.name));
        } else if !toolbar_ids.insert(toolbar.uuid.as_str()) {
            errors.push(format!("Duplicate toolbar uuid: '{}'", toolbar.uuid));
        }
        *toolbar_names.entry(toolbar.name.as_str()).or_default() += 1;
    }
    for (name, count) in toolbar_names {
        if count > 1 {
            warnings.push(format!("{} toolbars are named '{}'", count, name));
        }
    }

    let mut item_ids = HashSet::new();
    for toolbar in &settings.toolbars {
        for (i, item) in toolbar.items.iter().enumerate() {
            if item.uuid.is_empty() {
                errors.push(format!("Toolbar '{}': item {} has no uuid", toolbar.name, i));
            } else if !item_ids.insert(item.uuid.as_str()) {
                errors.push(format!("Duplicate item uuid: '{}'", item.uuid));
            }

            let item_type = item.item_type();
            if item_type.references_toolbar() && item.link.is_empty() {
                warnings.push(format!(
                    "Toolbar '{}': {} item '{}' has no toolbar",
                    toolbar.name, item_type, item.label
                ));
            } else if item_type.references_toolbar() && !toolbar_ids.contains(item.link.as_str()) {
                errors.push(format!(
                    "Toolbar '{}': {} item '{}' references unknown toolbar '{}'",
                    toolbar.name, item_type, item.label, item.link
                ));
            }
            if item_type == ItemType::Uri
                && !item.link_attr.has_vars
                && !item.link.is_empty()
                && url::Url::parse(&item.link).is_err()
            {
                warnings.push(format!(
                    "Toolbar '{}': item '{}' has an invalid URI '{}'",
                    toolbar.name, item.label, item.link
                ));
            }
            if item_type.script_kind().is_some() && item.script_config.is_none() {
                warnings.push(format!(
                    "Toolbar '{}': {} item '{}' has no script configuration",
                    toolbar.name, item_type, item.label
                ));
            }
        }
    }

    for mapping in &settings.folder_mappings {
        if mapping.toolbar.is_empty() {
            warnings.push(format!("Folder mapping '{}' has no toolbar", mapping.folder));
        } else if !toolbar_ids.contains(mapping.toolbar.as_str()) {
            errors.push(format!(
                "Folder mapping '{}' references unknown toolbar '{}'",
                mapping.folder, mapping.toolbar
            ));
        }
    }

    for (i, rule) in settings.rules.iter().enumerate() {
        if !toolbar_ids.contains(rule.toolbar.as_str()) {
            errors.push(format!("Rule {} references unknown toolbar '{}'", i, rule.toolbar));
        }
    }

    ValidationResult {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}
