//! Upgrades a persisted settings blob to [`SETTINGS_VERSION`].
//!
//! The blob is migrated as raw JSON, before it is deserialized into
//! [`crate::settings::Settings`], because older revisions don't fit the
//! current types. Each step assumes every earlier step has already run, and
//! no step may fail: missing or malformed legacy fields leave that entry
//! untouched.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::settings::SETTINGS_VERSION;

/// Onboarding prompt that explains folder mappings to new users.
pub const FOLDER_MAPPING_ONBOARDING: &str = "new-folder-mapping";

pub struct MigrationStep {
    /// Version this step upgrades from; `None` is the unversioned first release.
    pub from: Option<f64>,
    pub to: f64,
    pub description: &'static str,
    pub apply: fn(&mut Value),
}

/// The historical chain, oldest first. Append only.
pub static MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        from: None,
        to: 20240318.1,
        description: "move toolbar styles into defaultStyles, add mobileStyles",
        apply: split_toolbar_styles,
    },
    MigrationStep {
        from: Some(20240318.1),
        to: 20240322.1,
        description: "add link attributes to items",
        apply: add_link_attributes,
    },
    MigrationStep {
        from: Some(20240322.1),
        to: 20240330.1,
        description: "rename item url to link, type link attributes",
        apply: type_item_links,
    },
    MigrationStep {
        from: Some(20240330.1),
        to: 20240416.1,
        description: "replace hide flags with contexts, position with positions",
        apply: introduce_contexts,
    },
    MigrationStep {
        from: Some(20240416.1),
        to: 20240426.1,
        description: "split positions and visibility per platform",
        apply: split_per_platform,
    },
    MigrationStep {
        from: Some(20240426.1),
        to: 20240520.1,
        description: "assign uuids, reference toolbars by uuid",
        apply: reference_toolbars_by_uuid,
    },
    MigrationStep {
        from: Some(20240520.1),
        to: 20240727.1,
        description: "skip folder mapping onboarding for existing mappings",
        apply: mark_mapping_onboarding_seen,
    },
    MigrationStep {
        from: Some(20240727.1),
        to: 20250115.1,
        description: "mark existing items as user-authored",
        apply: mark_items_not_in_gallery,
    },
    MigrationStep {
        from: Some(20250115.1),
        to: SETTINGS_VERSION,
        description: "flatten allViews out of item visibility",
        apply: flatten_item_visibility,
    },
];

/// Read the version recorded in a blob. Numeric strings are accepted.
pub fn blob_version(blob: &Value) -> Option<f64> {
    match blob.get("version")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Migrate a blob from the version it records.
pub fn migrate(blob: &mut Value) -> Vec<f64> {
    let from = blob_version(blob);
    run(blob, from)
}

/// Apply every step from `from` onwards, then stamp the blob with
/// [`SETTINGS_VERSION`]. Returns the versions of the steps that ran.
pub fn run(blob: &mut Value, from: Option<f64>) -> Vec<f64> {
    if !blob.is_object() {
        warn!("settings blob is not an object, starting from empty settings");
        *blob = Value::Object(Map::new());
    }

    let mut current = from;
    let mut applied = Vec::new();
    while let Some(step) = MIGRATIONS
        .iter()
        .find(|step| same_version(step.from, current))
    {
        debug!(
            from = ?step.from,
            to = step.to,
            "migrating settings: {}",
            step.description
        );
        (step.apply)(blob);
        applied.push(step.to);
        current = Some(step.to);
    }

    if let Some(obj) = blob.as_object_mut() {
        obj.insert("version".to_string(), json!(SETTINGS_VERSION));
    }
    applied
}

// Persisted versions are decimals; compare with a tolerance well below the
// 0.1 spacing of revision numbers.
fn same_version(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() < 1e-6,
        _ => false,
    }
}

// ── Traversal helpers ──────────────────────────────────────────────────────

fn toolbars_mut(blob: &mut Value) -> impl Iterator<Item = &mut Map<String, Value>> + '_ {
    blob.get_mut("toolbars")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn items_mut(toolbar: &mut Map<String, Value>) -> impl Iterator<Item = &mut Map<String, Value>> + '_ {
    toolbar
        .get_mut("items")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn for_each_item(blob: &mut Value, mut f: impl FnMut(&mut Map<String, Value>)) {
    for toolbar in toolbars_mut(blob) {
        for item in items_mut(toolbar) {
            f(item);
        }
    }
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    obj.get(key).and_then(Value::as_bool)
}

fn has_id(obj: &Map<String, Value>) -> bool {
    obj.get("uuid")
        .and_then(Value::as_str)
        .map_or(false, |id| !id.is_empty())
}

fn ensure_id(obj: &mut Map<String, Value>) {
    if !has_id(obj) {
        obj.insert("uuid".to_string(), json!(uuid::Uuid::new_v4().to_string()));
    }
}

// ── Steps ──────────────────────────────────────────────────────────────────

fn split_toolbar_styles(blob: &mut Value) {
    for toolbar in toolbars_mut(blob) {
        if let Some(styles) = toolbar.remove("styles") {
            toolbar.insert("defaultStyles".to_string(), styles);
        }
        toolbar
            .entry("mobileStyles")
            .or_insert_with(|| json!([]));
    }
}

// Every existing link is assumed to be a URI that may contain variables.
fn add_link_attributes(blob: &mut Value) {
    for_each_item(blob, |item| {
        item.entry("linkAttr")
            .or_insert_with(|| json!({ "hasVars": true, "isUri": true }));
    });
}

fn type_item_links(blob: &mut Value) {
    for_each_item(blob, |item| {
        if let Some(url) = item.remove("url") {
            item.insert("link".to_string(), url);
        }
        if let Some(attr) = item.get_mut("linkAttr").and_then(Value::as_object_mut) {
            let is_uri = bool_field(attr, "isUri").unwrap_or(true);
            attr.remove("isUri");
            attr.insert(
                "type".to_string(),
                json!(if is_uri { "uri" } else { "file" }),
            );
            attr.entry("hasVars").or_insert(json!(true));
        }
    });
}

fn all_contexts() -> Value {
    json!([{ "platform": "all", "view": "all" }])
}

fn introduce_contexts(blob: &mut Value) {
    for toolbar in toolbars_mut(blob) {
        toolbar.remove("position");
        toolbar.insert(
            "positions".to_string(),
            json!([{ "position": "props", "contexts": all_contexts() }]),
        );

        for item in items_mut(toolbar) {
            let hide_desktop = item
                .remove("hideOnDesktop")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let hide_mobile = item
                .remove("hideOnMobile")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if item.contains_key("contexts") {
                continue;
            }
            let contexts = match (hide_desktop, hide_mobile) {
                (false, false) => all_contexts(),
                (true, false) => json!([{ "platform": "mobile", "view": "all" }]),
                (false, true) => json!([{ "platform": "desktop", "view": "all" }]),
                (true, true) => json!([]),
            };
            item.insert("contexts".to_string(), contexts);
        }
    }
}

/// Which of (desktop, mobile) a list of `{platform, view}` contexts covers.
fn covered_platforms(contexts: &Value) -> (bool, bool) {
    let mut desktop = false;
    let mut mobile = false;
    for platform in contexts
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|ctx| ctx.get("platform").and_then(Value::as_str))
    {
        match platform {
            "all" => {
                desktop = true;
                mobile = true;
            }
            "desktop" => desktop = true,
            "mobile" => mobile = true,
            _ => {}
        }
    }
    (desktop, mobile)
}

fn split_per_platform(blob: &mut Value) {
    let mut upgraded_items = 0usize;

    for toolbar in toolbars_mut(blob) {
        if let Some(positions) = toolbar.remove("positions") {
            let mut desktop: Option<Value> = None;
            let mut mobile: Option<Value> = None;
            for entry in positions.as_array().into_iter().flatten() {
                let Some(position) = entry.get("position").filter(|p| p.is_string()) else {
                    continue;
                };
                let (on_desktop, on_mobile) =
                    covered_platforms(entry.get("contexts").unwrap_or(&Value::Null));
                if on_desktop {
                    desktop.get_or_insert_with(|| position.clone());
                }
                if on_mobile {
                    mobile.get_or_insert_with(|| position.clone());
                }
            }
            // A platform no entry covers never showed the toolbar.
            let desktop = desktop.unwrap_or_else(|| json!("hidden"));
            let mobile = mobile.unwrap_or_else(|| json!("hidden"));
            toolbar.insert(
                "position".to_string(),
                json!({
                    "desktop": { "allViews": { "position": desktop } },
                    "mobile": { "allViews": { "position": mobile } },
                    "tablet": { "allViews": { "position": mobile } },
                }),
            );
        }

        for item in items_mut(toolbar) {
            let Some(contexts) = item.remove("contexts") else {
                continue;
            };
            // Shown platforms get no component list: the component set the
            // 20240426.1 release derived for them is not recoverable, so they
            // load with the current default. Hidden platforms show nothing.
            let (on_desktop, on_mobile) = covered_platforms(&contexts);
            let shell = |visible: bool| {
                if visible {
                    json!({ "allViews": {} })
                } else {
                    json!({ "allViews": { "components": [] } })
                }
            };
            item.insert(
                "visibility".to_string(),
                json!({
                    "desktop": shell(on_desktop),
                    "mobile": shell(on_mobile),
                    "tablet": shell(on_mobile),
                }),
            );
            upgraded_items += 1;
        }
    }

    if upgraded_items > 0 {
        warn!(
            items = upgraded_items,
            "item component visibility from settings before 20240426.1 was reset to the default"
        );
    }
}

fn reference_toolbars_by_uuid(blob: &mut Value) {
    // All toolbars need their uuid before any reference can be rewritten.
    let mut uuid_by_name: HashMap<String, String> = HashMap::new();
    for toolbar in toolbars_mut(blob) {
        ensure_id(toolbar);
        if let (Some(name), Some(id)) = (
            toolbar.get("name").and_then(Value::as_str),
            toolbar.get("uuid").and_then(Value::as_str),
        ) {
            uuid_by_name
                .entry(name.to_string())
                .or_insert_with(|| id.to_string());
        }
    }

    for_each_item(blob, |item| {
        ensure_id(item);
        let references_toolbar = matches!(
            item.get("linkAttr")
                .and_then(|attr| attr.get("type"))
                .and_then(Value::as_str),
            Some("group") | Some("menu")
        );
        if !references_toolbar {
            return;
        }
        let name = item.get("link").and_then(Value::as_str).map(str::to_string);
        match name.as_deref().and_then(|name| uuid_by_name.get(name)) {
            Some(id) => {
                item.insert("link".to_string(), json!(id));
            }
            None => {
                warn!(toolbar = ?name, "dropping item reference to unknown toolbar");
                item.remove("link");
            }
        }
    });

    let mappings = blob
        .get_mut("folderMappings")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut);
    for mapping in mappings {
        let name = mapping.get("toolbar").and_then(Value::as_str).map(str::to_string);
        match name.as_deref().and_then(|name| uuid_by_name.get(name)) {
            Some(id) => {
                mapping.insert("toolbar".to_string(), json!(id));
            }
            None => {
                warn!(toolbar = ?name, "dropping folder mapping reference to unknown toolbar");
                mapping.remove("toolbar");
            }
        }
    }
}

fn mark_mapping_onboarding_seen(blob: &mut Value) {
    let has_mappings = blob
        .get("folderMappings")
        .and_then(Value::as_array)
        .map_or(false, |mappings| !mappings.is_empty());
    if !has_mappings {
        return;
    }
    let Some(obj) = blob.as_object_mut() else {
        return;
    };
    let onboarding = obj
        .entry("onboarding")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Some(onboarding) = onboarding.as_object_mut() {
        onboarding.insert(FOLDER_MAPPING_ONBOARDING.to_string(), json!(true));
    }
}

fn mark_items_not_in_gallery(blob: &mut Value) {
    for_each_item(blob, |item| {
        item.insert("inGallery".to_string(), json!(false));
    });
}

fn flatten_item_visibility(blob: &mut Value) {
    for_each_item(blob, |item| {
        let Some(visibility) = item.get_mut("visibility").and_then(Value::as_object_mut) else {
            return;
        };
        for platform in ["desktop", "mobile", "tablet"] {
            let Some(entry) = visibility.get_mut(platform) else {
                continue;
            };
            if let Some(all_views) = entry.get_mut("allViews").map(Value::take) {
                *entry = all_views;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Platform, PositionType};

    fn legacy_blob() -> Value {
        json!({
            "toolbars": [
                {
                    "name": "My Toolbar",
                    "styles": ["border", "even"],
                    "position": "props",
                    "items": [
                        { "label": "Search", "url": "https://example.com/?q={{note_title}}",
                          "hideOnDesktop": false, "hideOnMobile": true },
                        { "label": "More", "url": "Other Toolbar" }
                    ]
                },
                {
                    "name": "Other Toolbar",
                    "styles": [],
                    "items": []
                }
            ],
            "folderMappings": [
                { "folder": "Projects", "toolbar": "My Toolbar" },
                { "folder": "Archive", "toolbar": "Deleted Toolbar" }
            ]
        })
    }

    #[test]
    fn test_chain_is_contiguous_and_ends_at_current_version() {
        assert!(MIGRATIONS[0].from.is_none());
        for pair in MIGRATIONS.windows(2) {
            assert_eq!(pair[1].from, Some(pair[0].to));
            assert!(pair[1].to > pair[0].to);
        }
        assert_eq!(MIGRATIONS.last().unwrap().to, SETTINGS_VERSION);
    }

    #[test]
    fn test_unversioned_styles_move_to_default_styles() {
        let mut blob = json!({
            "toolbars": [{ "name": "Tb", "styles": ["border", "sticky"], "items": [] }]
        });
        let applied = run(&mut blob, None);

        assert_eq!(applied.len(), MIGRATIONS.len());
        let tb = &blob["toolbars"][0];
        assert_eq!(tb["defaultStyles"], json!(["border", "sticky"]));
        assert_eq!(tb["mobileStyles"], json!([]));
        assert!(tb.get("styles").is_none());
        assert_eq!(blob_version(&blob), Some(SETTINGS_VERSION));
    }

    #[test]
    fn test_current_blob_is_untouched() {
        let mut blob = json!({
            "version": SETTINGS_VERSION,
            "toolbars": [{ "uuid": "t1", "name": "Tb", "items": [{ "uuid": "i1", "label": "x" }] }],
            "folderMappings": []
        });
        let before = blob.clone();
        let applied = migrate(&mut blob);
        assert!(applied.is_empty());
        assert_eq!(blob, before);
    }

    #[test]
    fn test_unknown_version_is_stamped() {
        let mut blob = json!({ "version": 99999999.9, "toolbars": [] });
        let applied = migrate(&mut blob);
        assert!(applied.is_empty());
        assert_eq!(blob["version"], json!(SETTINGS_VERSION));
    }

    #[test]
    fn test_string_version_is_accepted() {
        let blob = json!({ "version": "20240727.1" });
        assert_eq!(blob_version(&blob), Some(20240727.1));
    }

    #[test]
    fn test_version_parsed_from_text_matches_step() {
        let mut blob: Value =
            serde_json::from_str(r#"{ "version": 20240727.1, "toolbars": [] }"#).unwrap();
        let applied = migrate(&mut blob);
        assert_eq!(applied, vec![20250115.1, SETTINGS_VERSION]);
    }

    #[test]
    fn test_non_object_blob_becomes_empty_settings() {
        let mut blob = Value::Null;
        run(&mut blob, None);
        assert_eq!(blob, json!({ "version": SETTINGS_VERSION }));
    }

    fn load(blob: Value) -> crate::settings::Settings {
        serde_json::from_value(blob).unwrap()
    }

    #[test]
    fn test_non_uri_link_becomes_file_item() {
        let mut blob = json!({
            "version": 20240322.1,
            "toolbars": [{ "name": "Tb", "items": [
                { "label": "Today", "url": "Daily/today.md",
                  "linkAttr": { "hasVars": false, "isUri": false } }
            ]}]
        });
        let applied = run(&mut blob, Some(20240322.1));
        assert_eq!(applied[0], 20240330.1);

        let item = &blob["toolbars"][0]["items"][0];
        assert_eq!(item["link"], json!("Daily/today.md"));
        assert_eq!(item["linkAttr"]["type"], json!("file"));
        assert_eq!(item["linkAttr"]["hasVars"], json!(false));
        assert!(item["linkAttr"].get("isUri").is_none());
        assert!(item.get("url").is_none());
    }

    #[test]
    fn test_hidden_on_desktop_becomes_mobile_only() {
        let mut blob = json!({
            "version": 20240330.1,
            "toolbars": [{ "name": "Tb", "items": [
                { "label": "Phone", "link": "x", "hideOnDesktop": true, "hideOnMobile": false }
            ]}]
        });
        introduce_contexts(&mut blob);
        let item = &blob["toolbars"][0]["items"][0];
        assert_eq!(item["contexts"], json!([{ "platform": "mobile", "view": "all" }]));
        assert!(item.get("hideOnDesktop").is_none());

        let mut blob = json!({
            "version": 20240330.1,
            "toolbars": [{ "name": "Tb", "items": [
                { "label": "Phone", "link": "x", "hideOnDesktop": true, "hideOnMobile": false }
            ]}]
        });
        run(&mut blob, Some(20240330.1));
        let settings = load(blob);
        let visibility = &settings.toolbars[0].items[0].visibility;
        assert!(visibility.is_hidden_on(Platform::Desktop));
        assert!(!visibility.is_hidden_on(Platform::Mobile));
        assert!(!visibility.is_hidden_on(Platform::Tablet));
    }

    #[test]
    fn test_hidden_everywhere_hides_every_platform() {
        let mut blob = json!({
            "version": 20240330.1,
            "toolbars": [{ "name": "Tb", "items": [
                { "label": "Ghost", "link": "x", "hideOnDesktop": true, "hideOnMobile": true }
            ]}]
        });
        run(&mut blob, Some(20240330.1));

        let item = &blob["toolbars"][0]["items"][0];
        for platform in ["desktop", "mobile", "tablet"] {
            assert_eq!(item["visibility"][platform]["components"], json!([]), "{}", platform);
        }
        let settings = load(blob);
        for platform in Platform::ALL {
            assert!(settings.toolbars[0].items[0].visibility.is_hidden_on(platform));
        }
    }

    #[test]
    fn test_uncovered_platform_position_is_hidden() {
        let mut blob = json!({
            "version": 20240416.1,
            "toolbars": [{
                "name": "Desk",
                "positions": [{ "position": "top", "contexts": [{ "platform": "desktop", "view": "all" }] }],
                "items": []
            }]
        });
        let applied = run(&mut blob, Some(20240416.1));
        assert_eq!(applied[0], 20240426.1);

        let settings = load(blob);
        let position = &settings.toolbars[0].position;
        assert_eq!(position.for_platform(Platform::Desktop), PositionType::Top);
        assert_eq!(position.for_platform(Platform::Mobile), PositionType::Hidden);
        assert_eq!(position.for_platform(Platform::Tablet), PositionType::Hidden);
    }

    #[test]
    fn test_full_chain_on_legacy_blob() {
        let mut blob = legacy_blob();
        migrate(&mut blob);

        let my = &blob["toolbars"][0];
        let other_id = blob["toolbars"][1]["uuid"].as_str().unwrap().to_string();
        let my_id = my["uuid"].as_str().unwrap();
        assert!(!my_id.is_empty());
        assert_ne!(my_id, other_id);

        assert_eq!(my["position"]["desktop"]["allViews"]["position"], json!("props"));
        assert_eq!(my["position"]["tablet"]["allViews"]["position"], json!("props"));
        assert!(my.get("positions").is_none());

        let search = &my["items"][0];
        assert_eq!(search["link"], json!("https://example.com/?q={{note_title}}"));
        assert_eq!(search["linkAttr"], json!({ "type": "uri", "hasVars": true }));
        assert!(search.get("url").is_none());
        assert!(search.get("hideOnMobile").is_none());
        assert!(search.get("contexts").is_none());
        assert_eq!(search["visibility"]["desktop"], json!({}));
        assert_eq!(search["visibility"]["mobile"], json!({ "components": [] }));
        assert_eq!(search["visibility"]["tablet"], json!({ "components": [] }));
        assert_eq!(search["inGallery"], json!(false));
        assert!(!search["uuid"].as_str().unwrap().is_empty());

        assert_eq!(blob["folderMappings"][0]["toolbar"], json!(my_id));
        assert!(blob["folderMappings"][1].get("toolbar").is_none());
        assert_eq!(blob["folderMappings"][1]["folder"], json!("Archive"));
        assert_eq!(blob["onboarding"][FOLDER_MAPPING_ONBOARDING], json!(true));
    }

    #[test]
    fn test_group_reference_rewritten_to_uuid() {
        let mut blob = json!({
            "version": 20240426.1,
            "toolbars": [
                { "name": "Main", "items": [
                    { "label": "Sub", "link": "Sub", "linkAttr": { "type": "group" } },
                    { "label": "Gone", "link": "Missing", "linkAttr": { "type": "menu" } },
                    { "label": "Web", "link": "Sub", "linkAttr": { "type": "uri" } }
                ]},
                { "uuid": "existing-id", "name": "Sub", "items": [] }
            ]
        });
        migrate(&mut blob);

        let items = &blob["toolbars"][0]["items"];
        assert_eq!(items[0]["link"], json!("existing-id"));
        assert!(items[1].get("link").is_none());
        assert_eq!(items[2]["link"], json!("Sub"));
        assert_eq!(blob["toolbars"][1]["uuid"], json!("existing-id"));
    }

    #[test]
    fn test_onboarding_untouched_without_mappings() {
        let mut blob = json!({ "version": 20240520.1, "folderMappings": [] });
        migrate(&mut blob);
        assert!(blob.get("onboarding").is_none());
    }

    #[test]
    fn test_flatten_all_views() {
        let mut blob = json!({
            "version": 20250115.1,
            "toolbars": [{ "items": [{ "visibility": {
                "desktop": { "allViews": { "components": ["icon"] } },
                "mobile": { "allViews": { "components": [] } },
                "tablet": { "components": ["label"] }
            }}]}]
        });
        migrate(&mut blob);
        let visibility = &blob["toolbars"][0]["items"][0]["visibility"];
        assert_eq!(visibility["desktop"], json!({ "components": ["icon"] }));
        assert_eq!(visibility["mobile"], json!({ "components": [] }));
        assert_eq!(visibility["tablet"], json!({ "components": ["label"] }));
    }

    #[test]
    fn test_malformed_entries_do_not_panic() {
        let mut blob = json!({
            "toolbars": [
                "not a toolbar",
                { "items": "not a list" },
                { "items": [42, null, { "linkAttr": "odd", "hideOnDesktop": "yes" }] }
            ],
            "folderMappings": [ 7, { "folder": "x" } ],
            "onboarding": "seen"
        });
        migrate(&mut blob);
        assert_eq!(blob["version"], json!(SETTINGS_VERSION));
        assert_eq!(blob["onboarding"], json!("seen"));
    }

    #[test]
    fn test_older_blobs_apply_a_superset_of_steps() {
        let starts: Vec<Option<f64>> = MIGRATIONS.iter().map(|step| step.from).collect();
        for (i, older) in starts.iter().enumerate() {
            for newer in &starts[i + 1..] {
                let older_steps = run(&mut legacy_blob(), *older);
                let newer_steps = run(&mut legacy_blob(), *newer);
                assert!(older_steps.len() > newer_steps.len());
                assert!(older_steps.ends_with(&newer_steps));
            }
        }
    }

    #[test]
    fn test_migrated_blob_loads_as_settings() {
        let mut blob = legacy_blob();
        migrate(&mut blob);
        let settings: crate::settings::Settings = serde_json::from_value(blob).unwrap();
        assert_eq!(settings.toolbars.len(), 2);
        assert_eq!(settings.toolbars[0].default_styles, vec!["border", "even"]);
        let result = crate::settings::validate_settings(&settings);
        assert!(result.errors.iter().all(|e| !e.contains("Duplicate")));
    }
}
