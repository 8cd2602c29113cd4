use serde_json::{Map, Value, json};

/// Folds one service's OpenAPI document into the aggregated gateway document.
///
/// Service paths are copied in, each operation stamped as requiring bearer
/// auth. On a key clash, paths and definitions both take the service version.
pub fn merge_service_doc(merged: &mut Map<String, Value>, mut service_doc: Map<String, Value>) {
    if let Some(paths) = service_doc.get_mut("paths").and_then(Value::as_object_mut) {
        let target = ensure_object(merged, "paths");
        for (path, mut item) in std::mem::take(paths) {
            stamp_bearer_security(&mut item);
            target.insert(path, item);
        }
    }

    if let Some(defs) = service_doc
        .get_mut("definitions")
        .and_then(Value::as_object_mut)
    {
        let target = ensure_object(merged, "definitions");
        for (name, schema) in std::mem::take(defs) {
            target.insert(name, schema);
        }
    }
}

/// Marks every operation under a path item with the gateway's bearer scheme.
/// Non-object members (e.g. a `parameters` array) are left alone.
fn stamp_bearer_security(path_item: &mut Value) {
    let Some(item) = path_item.as_object_mut() else {
        return;
    };
    for operation in item.values_mut() {
        if let Some(operation) = operation.as_object_mut() {
            operation.insert("security".to_string(), json!([{ "BearerAuth": [] }]));
        }
    }
}

fn ensure_object<'a>(doc: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = doc
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn service_paths_are_merged_with_a_security_stamp() {
        let mut merged = as_map(json!({
            "swagger": "2.0",
            "paths": { "/auth/token": { "post": { "summary": "token" } } }
        }));
        let service = as_map(json!({
            "paths": {
                "/drivers": {
                    "get": { "summary": "list" },
                    "post": { "summary": "create" }
                }
            }
        }));

        merge_service_doc(&mut merged, service);

        let paths = merged["paths"].as_object().unwrap();
        assert!(paths.contains_key("/auth/token"));
        assert_eq!(
            paths["/drivers"]["get"]["security"],
            json!([{ "BearerAuth": [] }])
        );
        assert_eq!(
            paths["/drivers"]["post"]["security"],
            json!([{ "BearerAuth": [] }])
        );
        // The gateway's own operations are never stamped by a merge.
        assert!(paths["/auth/token"]["post"].get("security").is_none());
    }

    #[test]
    fn colliding_paths_take_the_service_version() {
        let mut merged = as_map(json!({
            "paths": { "/drivers": { "get": { "summary": "stale" } } }
        }));
        let service = as_map(json!({
            "paths": { "/drivers": { "get": { "summary": "fresh" } } }
        }));

        merge_service_doc(&mut merged, service);
        assert_eq!(merged["paths"]["/drivers"]["get"]["summary"], "fresh");
    }

    #[test]
    fn colliding_definitions_take_the_service_version() {
        let mut merged = as_map(json!({
            "definitions": { "Token": { "type": "object" } }
        }));
        let service = as_map(json!({
            "definitions": {
                "Token": { "type": "string" },
                "Driver": { "type": "object" }
            }
        }));

        merge_service_doc(&mut merged, service);

        let defs = merged["definitions"].as_object().unwrap();
        assert_eq!(defs["Token"]["type"], "string");
        assert_eq!(defs["Driver"]["type"], "object");
    }

    #[test]
    fn gateway_doc_without_sections_gains_them() {
        let mut merged = as_map(json!({ "swagger": "2.0" }));
        let service = as_map(json!({
            "paths": { "/drivers": { "get": {} } },
            "definitions": { "Driver": { "type": "object" } }
        }));

        merge_service_doc(&mut merged, service);
        assert!(merged["paths"].as_object().is_some());
        assert!(merged["definitions"].as_object().is_some());
    }

    #[test]
    fn non_object_path_items_are_ignored_for_stamping() {
        let mut merged = as_map(json!({}));
        let service = as_map(json!({
            "paths": {
                "/drivers": {
                    "get": { "summary": "list" },
                    "parameters": [{ "name": "page" }]
                }
            }
        }));

        merge_service_doc(&mut merged, service);
        assert_eq!(
            merged["paths"]["/drivers"]["parameters"],
            json!([{ "name": "page" }])
        );
    }
}
