//! Built-in steps for the bridge message schema.
//!
//! - `0.5`: `bridge_messages` documents `{_id, platform, id, bridges: [{platform, id}]}`
//! - `0.6`: `bridge_messages` documents `{_id, origin: {platform, id}, remotes: [{platform, id}]}`
//! - `0.7`: `bridge_entries` documents `{_id, origin_platform, origin_id, remotes: {platform: id}}`

use serde_json::{Map, Value, json};

use crate::{
    engine::{Document, MigrationStep},
    error::{Context, Result},
};

pub const LEGACY_COLLECTION: &str = "bridge_messages";
pub const ENTRIES_COLLECTION: &str = "bridge_entries";

pub fn steps() -> Vec<MigrationStep> {
    vec![
        MigrationStep::new("0.5", "0.6", LEGACY_COLLECTION, LEGACY_COLLECTION, v05_to_v06),
        MigrationStep::new("0.6", "0.7", LEGACY_COLLECTION, ENTRIES_COLLECTION, v06_to_v07),
        MigrationStep::new("0.7", "0.6", ENTRIES_COLLECTION, LEGACY_COLLECTION, v07_to_v06),
    ]
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing string field '{key}'"))
}

fn array_field<'a>(obj: &'a Document, key: &str) -> Result<&'a [Value]> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => None.with_context(|| format!("field '{key}' is not an array")),
    }
}

/// `[{platform, id}]` pairs, skipping entries with an empty id.
fn platform_pairs(items: &[Value]) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        let obj = item.as_object().context("remote is not an object")?;
        let platform = str_field(obj, "platform")?;
        let id = str_field(obj, "id")?;
        if !id.is_empty() {
            pairs.push((platform.to_string(), id.to_string()));
        }
    }
    Ok(pairs)
}

fn into_document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn v05_to_v06(doc: Document) -> Result<Document> {
    let platform = str_field(&doc, "platform")?;
    let id = str_field(&doc, "id")?;
    let remotes: Vec<Value> = platform_pairs(array_field(&doc, "bridges")?)?
        .into_iter()
        .map(|(platform, id)| json!({ "platform": platform, "id": id }))
        .collect();
    Ok(into_document(json!({
        "origin": { "platform": platform, "id": id },
        "remotes": remotes,
    })))
}

fn v06_to_v07(doc: Document) -> Result<Document> {
    let origin = doc
        .get("origin")
        .and_then(Value::as_object)
        .context("missing origin")?;
    let mut remotes = Map::new();
    // Later duplicates for the same platform win.
    for (platform, id) in platform_pairs(array_field(&doc, "remotes")?)? {
        remotes.insert(platform, Value::String(id));
    }
    Ok(into_document(json!({
        "origin_platform": str_field(origin, "platform")?,
        "origin_id": str_field(origin, "id")?,
        "remotes": remotes,
    })))
}

fn v07_to_v06(doc: Document) -> Result<Document> {
    let mut remotes: Vec<(&String, &str)> = match doc.get("remotes") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(platform, id)| id.as_str().map(|id| (platform, id)))
            .filter(|(_, id)| !id.is_empty())
            .collect(),
        Some(_) => return None.context("field 'remotes' is not an object"),
    };
    remotes.sort();
    let remotes: Vec<Value> = remotes
        .into_iter()
        .map(|(platform, id)| json!({ "platform": platform, "id": id }))
        .collect();
    Ok(into_document(json!({
        "origin": {
            "platform": str_field(&doc, "origin_platform")?,
            "id": str_field(&doc, "origin_id")?,
        },
        "remotes": remotes,
    })))
}
