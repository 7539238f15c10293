//! JSON schemas for OpenAI strict structured outputs.
//!
//! Schemas are derived from Rust types with `schemars` and then rewritten
//! into the subset strict mode accepts:
//!
//! 1. every `$ref` is inlined (strict mode does not resolve definitions)
//! 2. every object gets `additionalProperties: false`
//! 3. every property is listed in `required`; optional fields stay nullable
//! 4. keywords strict mode rejects (`format`, `default`, `$schema`) are dropped

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Keywords removed from every schema node.
const UNSUPPORTED_KEYWORDS: &[&str] = &["format", "default", "$schema", "definitions"];

/// Types that can be requested as a structured output document.
///
/// Blanket-implemented for anything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode schema for this type.
    fn openai_schema() -> Value {
        let root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = root
            .get("definitions")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        normalize(root, &definitions)
    }

    /// Name used for the `json_schema.name` field.
    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn normalize(value: Value, definitions: &Map<String, Value>) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get("$ref") {
                if let Some(target) = path
                    .strip_prefix("#/definitions/")
                    .and_then(|name| definitions.get(name))
                {
                    // Sibling keywords of a $ref (description) are kept on top of the target.
                    let mut inlined = normalize(target.clone(), definitions);
                    if let (Value::Object(inlined_map), Some(description)) =
                        (&mut inlined, map.get("description"))
                    {
                        inlined_map.insert("description".to_string(), description.clone());
                    }
                    return inlined;
                }
            }

            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                if UNSUPPORTED_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                out.insert(key, normalize(child, definitions));
            }

            if out.get("type").and_then(Value::as_str) == Some("object") {
                out.insert("additionalProperties".to_string(), Value::Bool(false));
                let required: Vec<Value> = out
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default();
                out.insert("required".to_string(), Value::Array(required));
            }

            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| normalize(item, definitions))
                .collect(),
        ),
        other => other,
    }
}
