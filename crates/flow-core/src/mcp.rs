//! MCP server registry merge.
//!
//! Package entries are added to the user's `mcp.json` only when their name is
//! missing. Existing entries are never modified, not even field by field.

use crate::error::{FlowError, Result};
use crate::io;
use crate::types::{ConfigMergeReport, MergeAction};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::path::Path;

/// Top-level key holding the named-entry registry.
pub const REGISTRY_KEY: &str = "mcpServers";

/// Read the package-provided config fragment.
pub fn load_package_config(path: &Path) -> Result<Value> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

/// Number of named entries in a document's registry.
pub fn entry_count(doc: &Value) -> usize {
    doc.get(REGISTRY_KEY)
        .and_then(Value::as_object)
        .map_or(0, Map::len)
}

/// Add every package entry whose key is absent from `user`'s registry.
///
/// Returns the merged document and the number of entries added. Existing user
/// keys keep their position; new keys follow in package order. Fails when the
/// user's registry exists but is not an object.
pub fn merge_entries(
    mut user: Map<String, Value>,
    package: &Value,
) -> std::result::Result<(Map<String, Value>, usize), String> {
    let Some(incoming) = package.get(REGISTRY_KEY).and_then(Value::as_object) else {
        return Ok((user, 0));
    };

    // Edit in place: removing and re-inserting would move the key.
    let added = match user.get_mut(REGISTRY_KEY) {
        Some(Value::Object(registry)) => add_missing(registry, incoming),
        Some(slot @ Value::Null) => {
            let mut registry = Map::new();
            let added = add_missing(&mut registry, incoming);
            if added > 0 {
                *slot = Value::Object(registry);
            }
            added
        }
        None => {
            let mut registry = Map::new();
            let added = add_missing(&mut registry, incoming);
            if added > 0 {
                user.insert(REGISTRY_KEY.to_string(), Value::Object(registry));
            }
            added
        }
        Some(other) => {
            return Err(format!(
                "\"{REGISTRY_KEY}\" must be an object, found {}",
                json_kind(other)
            ))
        }
    };
    Ok((user, added))
}

fn add_missing(registry: &mut Map<String, Value>, incoming: &Map<String, Value>) -> usize {
    let mut added = 0;
    for (name, entry) in incoming {
        if !registry.contains_key(name) {
            registry.insert(name.clone(), entry.clone());
            added += 1;
        }
    }
    added
}

/// Merge `package` into the config file at `user_path`.
///
/// - missing or unparseable file: write the package config (`created`)
/// - nothing to add: leave the file alone (`skipped`)
/// - otherwise: back up, then write the merged document (`updated`)
///
/// An unparseable file is backed up before it is replaced. A failed backup
/// aborts the merge before `user_path` is touched.
pub fn merge_config(user_path: &Path, package: &Value) -> Result<ConfigMergeReport> {
    merge_config_at(user_path, package, Utc::now())
}

/// [`merge_config`] with an explicit backup timestamp.
pub fn merge_config_at(
    user_path: &Path,
    package: &Value,
    now: DateTime<Utc>,
) -> Result<ConfigMergeReport> {
    let existing = match std::fs::read(user_path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let Some(bytes) = existing else {
        write_pretty(user_path, package)?;
        let report = created_report(package, None);
        tracing::info!(path = %user_path.display(), entries = report.entries_added, "config created");
        return Ok(report);
    };

    let user = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::warn!(
                path = %user_path.display(),
                kind = json_kind(&other),
                "config is not a JSON object, replacing with package config"
            );
            return recover(user_path, package, &bytes, now);
        }
        Err(e) => {
            tracing::warn!(
                path = %user_path.display(),
                error = %e,
                "config is not valid JSON, replacing with package config"
            );
            return recover(user_path, package, &bytes, now);
        }
    };

    let (merged, added) =
        merge_entries(user, package).map_err(|reason| FlowError::InvalidConfig {
            path: user_path.to_path_buf(),
            reason,
        })?;

    if added == 0 {
        tracing::info!(path = %user_path.display(), "config unchanged");
        return Ok(ConfigMergeReport::skipped());
    }

    let backup = io::create_backup(user_path, &bytes, now)?;
    write_pretty(user_path, &Value::Object(merged))?;
    tracing::info!(path = %user_path.display(), entries = added, "config updated");

    Ok(ConfigMergeReport {
        action: MergeAction::Updated,
        entries_added: added,
        backup_created: true,
        backup_path: Some(backup),
    })
}

fn recover(
    user_path: &Path,
    package: &Value,
    original: &[u8],
    now: DateTime<Utc>,
) -> Result<ConfigMergeReport> {
    let backup = io::create_backup(user_path, original, now)?;
    write_pretty(user_path, package)?;
    Ok(created_report(package, Some(backup)))
}

fn created_report(package: &Value, backup: Option<std::path::PathBuf>) -> ConfigMergeReport {
    ConfigMergeReport {
        action: MergeAction::Created,
        entries_added: entry_count(package),
        backup_created: backup.is_some(),
        backup_path: backup,
    }
}

/// Two-space pretty JSON with a trailing newline.
pub fn to_pretty_string(doc: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(doc)?;
    out.push('\n');
    Ok(out)
}

fn write_pretty(path: &Path, doc: &Value) -> Result<()> {
    io::atomic_write(path, to_pretty_string(doc)?.as_bytes())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn backups(dir: &Path) -> Vec<std::path::PathBuf> {
        let mut found: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(".bak"))
            .collect();
        found.sort();
        found
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    fn package() -> Value {
        json!({
            "mcpServers": {
                "x": { "command": "npx", "args": ["x-server"] },
                "y": { "command": "uvx", "args": ["y-server"] }
            }
        })
    }

    #[test]
    fn missing_file_is_created_with_package_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");

        let report = merge_config(&path, &package()).unwrap();
        assert_eq!(report.action, MergeAction::Created);
        assert_eq!(report.entries_added, 2);
        assert!(!report.backup_created);
        assert_eq!(read_json(&path), package());
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn written_json_uses_two_space_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        merge_config(&path, &json!({"mcpServers": {"x": {"command": "a"}}})).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "{\n  \"mcpServers\": {\n    \"x\": {\n      \"command\": \"a\"\n    }\n  }\n}\n"
        );
    }

    #[test]
    fn adds_missing_entry_and_backs_up() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        let original = "{\"mcpServers\":{\"x\":{\"command\":\"mine\"}}}";
        std::fs::write(&path, original).unwrap();

        let report = merge_config(&path, &package()).unwrap();
        assert_eq!(report.action, MergeAction::Updated);
        assert_eq!(report.entries_added, 1);
        assert!(report.backup_created);

        let merged = read_json(&path);
        assert_eq!(merged["mcpServers"]["x"], json!({"command": "mine"}));
        assert_eq!(merged["mcpServers"]["y"], package()["mcpServers"]["y"]);

        let found = backups(dir.path());
        assert_eq!(found.len(), 1);
        assert_eq!(report.backup_path.as_deref(), Some(found[0].as_path()));
        assert_eq!(std::fs::read_to_string(&found[0]).unwrap(), original);
    }

    #[test]
    fn nothing_to_add_is_skipped_without_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        let original = "{\"mcpServers\":{\"x\":{},\"y\":{}}}";
        std::fs::write(&path, original).unwrap();

        let report = merge_config(&path, &package()).unwrap();
        assert_eq!(report, ConfigMergeReport::skipped());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(backups(dir.path()).is_empty());
    }

    #[test]
    fn second_merge_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{\"mcpServers\":{}}").unwrap();

        assert_eq!(merge_config(&path, &package()).unwrap().action, MergeAction::Updated);
        assert_eq!(merge_config(&path, &package()).unwrap().action, MergeAction::Skipped);
        assert_eq!(backups(dir.path()).len(), 1);
    }

    #[test]
    fn unparseable_file_is_replaced_after_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{ not json").unwrap();

        let report = merge_config(&path, &package()).unwrap();
        assert_eq!(report.action, MergeAction::Created);
        assert_eq!(report.entries_added, 2);
        assert!(report.backup_created);
        assert_eq!(read_json(&path), package());
        let found = backups(dir.path());
        assert_eq!(std::fs::read_to_string(&found[0]).unwrap(), "{ not json");
    }

    #[test]
    fn non_object_document_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let report = merge_config(&path, &package()).unwrap();
        assert_eq!(report.action, MergeAction::Created);
        assert_eq!(read_json(&path), package());
    }

    #[test]
    fn non_object_registry_is_rejected_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        let original = "{\"mcpServers\": [\"x\"]}";
        std::fs::write(&path, original).unwrap();

        let err = merge_config(&path, &package()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidConfig { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        assert!(backups(dir.path()).is_empty());
    }

    fn fixed_now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
    }

    fn occupy_backup_names(path: &Path) {
        for attempt in 0..io::MAX_BACKUP_ATTEMPTS {
            std::fs::write(io::backup_path(path, fixed_now(), attempt), "older").unwrap();
        }
    }

    #[test]
    fn failed_backup_aborts_update_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        let original = "{\"mcpServers\":{\"x\":{}}}";
        std::fs::write(&path, original).unwrap();
        occupy_backup_names(&path);

        let err = merge_config_at(&path, &package(), fixed_now()).unwrap_err();
        assert!(matches!(err, FlowError::Io(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
        for found in backups(dir.path()) {
            assert_eq!(std::fs::read_to_string(found).unwrap(), "older");
        }
    }

    #[test]
    fn failed_backup_aborts_recovery_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{ not json").unwrap();
        occupy_backup_names(&path);

        assert!(merge_config_at(&path, &package(), fixed_now()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn updates_in_the_same_millisecond_keep_both_backups() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp.json");
        std::fs::write(&path, "{}").unwrap();

        let first =
            merge_config_at(&path, &json!({"mcpServers": {"x": {}}}), fixed_now()).unwrap();
        let second = merge_config_at(&path, &package(), fixed_now()).unwrap();
        assert_eq!(first.backup_path, Some(io::backup_path(&path, fixed_now(), 0)));
        assert_eq!(second.backup_path, Some(io::backup_path(&path, fixed_now(), 1)));
        assert_eq!(
            std::fs::read_to_string(io::backup_path(&path, fixed_now(), 0)).unwrap(),
            "{}"
        );
        assert_eq!(
            read_json(&io::backup_path(&path, fixed_now(), 1)),
            json!({"mcpServers": {"x": {}}})
        );
    }

    #[test]
    fn merge_preserves_user_keys_and_order() {
        let user = json!({
            "theme": "dark",
            "mcpServers": { "b": {"v": 1}, "a": {"v": 2} }
        });
        let package = json!({
            "mcpServers": { "z": {"v": 3}, "a": {"v": 99}, "c": {"v": 4} }
        });
        let Value::Object(user) = user else { unreachable!() };

        let (merged, added) = merge_entries(user, &package).unwrap();
        assert_eq!(added, 2);
        assert_eq!(merged["theme"], "dark");
        assert_eq!(merged["mcpServers"]["a"], json!({"v": 2}));
        let keys: Vec<_> = merged["mcpServers"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, vec!["b", "a", "z", "c"]);
    }

    #[test]
    fn entries_added_is_set_difference() {
        let user = json!({ "mcpServers": { "x": {}, "q": {} } });
        let Value::Object(user) = user else { unreachable!() };
        let (_, added) = merge_entries(user, &package()).unwrap();
        assert_eq!(added, 1);
    }

    #[test]
    fn user_without_registry_gains_one() {
        let user = json!({ "other": true });
        let Value::Object(user) = user else { unreachable!() };
        let (merged, added) = merge_entries(user, &package()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(merged["other"], true);
        assert_eq!(entry_count(&Value::Object(merged)), 2);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let user = json!({ "mcpServers": { "X": {} } });
        let Value::Object(user) = user else { unreachable!() };
        let (_, added) = merge_entries(user, &package()).unwrap();
        assert_eq!(added, 2);
    }

    #[test]
    fn package_without_registry_adds_nothing() {
        let user = json!({ "mcpServers": { "x": {} } });
        let Value::Object(user) = user else { unreachable!() };
        let (merged, added) = merge_entries(user.clone(), &json!({})).unwrap();
        assert_eq!(added, 0);
        assert_eq!(merged, user);
    }
}
