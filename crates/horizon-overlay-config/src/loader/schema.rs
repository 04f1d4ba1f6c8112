//! Schema validation helpers for JSON5 overlay layers.

use crate::OverlayError;
use serde_json::{Map, Value};

/// Required fields per operation kind, besides the `op` tag.
const VALUE_FIELDS: &[&str] = &["key", "value"];
const ENTRY_VALUE_FIELDS: &[&str] = &["key", "entry", "value"];
const VALUES_FIELDS: &[&str] = &["key", "values"];
const ENTRY_FIELDS: &[&str] = &["key", "entry"];
const DERIVE_FIELDS: &[&str] = &["key", "derivation"];

/// Validate a base namespace or requirements layer: an object of settings.
pub(super) fn validate_namespace_schema(value: &Value, layer: &str) -> Result<(), OverlayError> {
    let map = expect_object(value, layer, "")?;
    for key in map.keys() {
        if key.trim().is_empty() {
            return Err(invalid_field(layer, "", "setting keys must not be empty"));
        }
    }
    Ok(())
}

/// Validate a single overlay layer against the schema.
pub(super) fn validate_overlay_schema(value: &Value, layer: &str) -> Result<(), OverlayError> {
    let map = expect_object(value, layer, "")?;
    ensure_allowed_keys(map, &["$schema", "operations"], layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("operations") {
        let ops = expect_array(value, layer, "operations")?;
        for (idx, op) in ops.iter().enumerate() {
            validate_operation(op, layer, &format!("operations[{idx}]"))?;
        }
    }
    Ok(())
}

/// Validate a single tagged operation.
fn validate_operation(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    let map = expect_object(value, layer, path)?;
    let op = map
        .get("op")
        .ok_or_else(|| invalid_field(layer, &join_path(path, "op"), "missing field"))?;
    let op = op
        .as_str()
        .ok_or_else(|| invalid_field(layer, &join_path(path, "op"), "expected string"))?;

    let required = match op {
        "set" | "set_secret" | "append" => VALUE_FIELDS,
        "set_entry" => ENTRY_VALUE_FIELDS,
        "extend" => VALUES_FIELDS,
        "remove" => ENTRY_FIELDS,
        "derive" => DERIVE_FIELDS,
        _ => {
            return Err(invalid_field(
                layer,
                &join_path(path, "op"),
                "expected set, set_secret, set_entry, extend, append, remove, or derive",
            ));
        }
    };
    ensure_fields(map, "op", required, &[], layer, path)?;

    validate_key(&map["key"], layer, &join_path(path, "key"))?;
    if let Some(value) = map.get("entry") {
        expect_string(value, layer, &join_path(path, "entry"))?;
    }
    if let Some(value) = map.get("values") {
        expect_array(value, layer, &join_path(path, "values"))?;
    }
    if let Some(value) = map.get("derivation") {
        validate_derivation(value, layer, &join_path(path, "derivation"))?;
    }
    Ok(())
}

/// Validate the "derivation" block of a derive operation.
fn validate_derivation(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    let map = expect_object(value, layer, path)?;
    let kind = map
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_field(layer, &join_path(path, "kind"), "expected string"))?;
    match kind {
        "endpoint" => {
            ensure_fields(map, "kind", &["host_key", "port"], &["scheme", "path"], layer, path)?;
            validate_key(&map["host_key"], layer, &join_path(path, "host_key"))?;
            expect_port(&map["port"], layer, &join_path(path, "port"))?;
            if let Some(value) = map.get("scheme") {
                expect_string(value, layer, &join_path(path, "scheme"))?;
            }
            if let Some(value) = map.get("path") {
                expect_string(value, layer, &join_path(path, "path"))?;
            }
        }
        "database" => {
            ensure_fields(
                map,
                "kind",
                &["driver", "user", "password_key", "host_key", "database"],
                &[],
                layer,
                path,
            )?;
            for field in ["driver", "user", "database"] {
                expect_string(&map[field], layer, &join_path(path, field))?;
            }
            validate_key(&map["password_key"], layer, &join_path(path, "password_key"))?;
            validate_key(&map["host_key"], layer, &join_path(path, "host_key"))?;
        }
        "path" => {
            ensure_fields(map, "kind", &["base_key", "segments"], &[], layer, path)?;
            validate_key(&map["base_key"], layer, &join_path(path, "base_key"))?;
            validate_string_array(&map["segments"], layer, &join_path(path, "segments"))?;
        }
        "path_list" => {
            ensure_fields(map, "kind", &["base_key", "entries"], &[], layer, path)?;
            validate_key(&map["base_key"], layer, &join_path(path, "base_key"))?;
            let entries = expect_array(&map["entries"], layer, &join_path(path, "entries"))?;
            for (idx, entry) in entries.iter().enumerate() {
                validate_string_array(entry, layer, &format!("{path}.entries[{idx}]"))?;
            }
        }
        _ => {
            return Err(invalid_field(
                layer,
                &join_path(path, "kind"),
                "expected endpoint, database, path, or path_list",
            ));
        }
    }
    Ok(())
}

/// Expect a non-empty setting key.
fn validate_key(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    match value.as_str() {
        Some(key) if !key.trim().is_empty() => Ok(()),
        Some(_) => Err(invalid_field(layer, path, "must not be empty")),
        None => Err(invalid_field(layer, path, "expected string")),
    }
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, OverlayError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON array or return a typed error.
fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, OverlayError> {
    match value {
        Value::Array(arr) => Ok(arr),
        _ => Err(invalid_field(layer, path, "expected array")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect an integer that fits a TCP port.
fn expect_port(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    match value.as_u64() {
        Some(port) if port <= u64::from(u16::MAX) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected port number")),
    }
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), OverlayError> {
    let arr = expect_array(value, layer, path)?;
    for (idx, entry) in arr.iter().enumerate() {
        if entry.as_str().is_none() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object has every required field and nothing unexpected.
fn ensure_fields(
    map: &Map<String, Value>,
    tag: &str,
    required: &[&str],
    optional: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), OverlayError> {
    for field in required {
        if !map.contains_key(*field) {
            return Err(invalid_field(layer, &join_path(path, field), "missing field"));
        }
    }
    for key in map.keys() {
        let key = key.as_str();
        if key != tag && !required.contains(&key) && !optional.contains(&key) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), OverlayError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> OverlayError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    OverlayError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
