//! Layered option merging.
//!
//! Options arrive as up to three layers, lowest precedence first: built-in
//! defaults, the template's shaping and the caller's own options. Layers are
//! folded together key by key according to [`MERGE_TABLE`]:
//!
//! | key           | rule                                                 |
//! |---------------|------------------------------------------------------|
//! | `moduleRules` | [`MergeRule::Concat`]                                |
//! | `plugins`     | [`MergeRule::Concat`]                                |
//! | `loaders`     | [`MergeRule::MergeKeys`]                             |
//! | `terser`      | [`MergeRule::MergeKeys`]                             |
//! | anything else | [`MergeRule::Replace`]                               |
//!
//! A `null` in a higher layer removes the key, restoring the built-in
//! default.

use log::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::Error;

/// A JSON object with its keys kept in insertion order.
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// The key used to replace, rather than extend, a concatenated list.
pub const REPLACE_KEY: &str = "replace";

/// How a higher layer's value for a key combines with a lower layer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// The higher value wins outright.
    Replace,
    /// Arrays are appended to the lower layer's array. A higher value of the
    /// form `{"replace": [...]}` replaces the list instead.
    Concat,
    /// Objects are merged one level deep, the higher layer's keys winning.
    MergeKeys,
}

/// Per-key merge policy. Keys not listed here use [`MergeRule::Replace`].
pub const MERGE_TABLE: &[(&str, MergeRule)] = &[
    ("moduleRules", MergeRule::Concat),
    ("plugins", MergeRule::Concat),
    ("loaders", MergeRule::MergeKeys),
    ("terser", MergeRule::MergeKeys),
];

/// Looks up the merge rule for a top-level option key.
pub fn rule_for(key: &str) -> MergeRule {
    MERGE_TABLE
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, rule)| *rule)
        .unwrap_or(MergeRule::Replace)
}

/// One precedence tier of options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLayer {
    name: String,
    values: JsonObject,
}

impl OptionLayer {
    /// Constructor. Fails unless `value` is a JSON object.
    pub fn new<N: AsRef<str>>(name: N, value: JsonValue) -> Result<Self, Error> {
        let name = name.as_ref().to_string();
        match value {
            JsonValue::Object(values) => Ok(Self { name, values }),
            JsonValue::Null => Ok(Self {
                name,
                values: JsonObject::new(),
            }),
            _ => Err(Error::LayerMustBeObject(name)),
        }
    }

    /// Serializes `value` into a layer.
    pub fn from_serialize<N, V>(name: N, value: &V) -> Result<Self, Error>
    where
        N: AsRef<str>,
        V: Serialize,
    {
        Self::new(name, serde_json::to_value(value)?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    pub fn values(&self) -> &JsonObject {
        &self.values
    }
}

/// Folds the given layers, lowest precedence first, into one object.
pub fn merge_layers(layers: &[OptionLayer]) -> Result<JsonObject, Error> {
    let mut merged = JsonObject::new();
    for layer in layers {
        debug!("Merging option layer \"{}\"", layer.name());
        for (key, value) in &layer.values {
            if value.is_null() {
                merged.remove(key);
                continue;
            }
            let combined = match rule_for(key) {
                MergeRule::Replace => value.clone(),
                MergeRule::Concat => concat(key, merged.get(key).cloned(), value)?,
                MergeRule::MergeKeys => merge_keys(merged.get(key).cloned(), value),
            };
            merged.insert(key.clone(), combined);
        }
    }
    Ok(merged)
}

/// Object spread: keys of `over` are copied onto `base`, replacing existing
/// ones but keeping their position.
pub fn spread(mut base: JsonObject, over: &JsonObject) -> JsonObject {
    for (k, v) in over {
        base.insert(k.clone(), v.clone());
    }
    base
}

fn concat(key: &str, lower: Option<JsonValue>, higher: &JsonValue) -> Result<JsonValue, Error> {
    let mut items = match lower {
        Some(JsonValue::Array(items)) => items,
        Some(_) => return Err(Error::InvalidListPatch(key.to_string())),
        None => Vec::new(),
    };
    match higher {
        JsonValue::Array(more) => items.extend(more.iter().cloned()),
        JsonValue::Object(patch) => match (patch.len(), patch.get(REPLACE_KEY)) {
            (1, Some(JsonValue::Array(replacement))) => items = replacement.clone(),
            _ => return Err(Error::InvalidListPatch(key.to_string())),
        },
        _ => return Err(Error::InvalidListPatch(key.to_string())),
    }
    Ok(JsonValue::Array(items))
}

fn merge_keys(lower: Option<JsonValue>, higher: &JsonValue) -> JsonValue {
    match (lower, higher) {
        (Some(JsonValue::Object(lower)), JsonValue::Object(higher)) => {
            JsonValue::Object(spread(lower, higher))
        }
        (_, higher) => higher.clone(),
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn layer(name: &str, value: JsonValue) -> OptionLayer {
        OptionLayer::new(name, value).unwrap()
    }

    #[test]
    fn scalars_are_replaced() {
        let merged = merge_layers(&[
            layer("defaults", json!({"debugPaths": false, "folders": ["."]})),
            layer("template", json!({"folders": ["themes/*"]})),
            layer("caller", json!({"debugPaths": true})),
        ])
        .unwrap();
        assert_eq!(
            JsonValue::Object(merged),
            json!({"debugPaths": true, "folders": ["themes/*"]})
        );
    }

    #[test]
    fn lists_are_concatenated_in_layer_order() {
        let merged = merge_layers(&[
            layer("defaults", json!({"plugins": []})),
            layer("template", json!({"plugins": [{"name": "a"}]})),
            layer("caller", json!({"plugins": [{"name": "b"}, {"name": "a"}]})),
        ])
        .unwrap();
        assert_eq!(
            merged["plugins"],
            json!([{"name": "a"}, {"name": "b"}, {"name": "a"}])
        );
    }

    #[test]
    fn lists_can_be_replaced() {
        let merged = merge_layers(&[
            layer("template", json!({"moduleRules": [{"test": "a"}]})),
            layer("caller", json!({"moduleRules": {"replace": [{"test": "b"}]}})),
        ])
        .unwrap();
        assert_eq!(merged["moduleRules"], json!([{"test": "b"}]));
    }

    #[test]
    fn malformed_list_patch_is_rejected() {
        let err = merge_layers(&[layer("caller", json!({"plugins": {"append": []}}))])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidListPatch(k) if k == "plugins"));
        let err = merge_layers(&[layer("caller", json!({"plugins": "x"}))]).unwrap_err();
        assert!(matches!(err, Error::InvalidListPatch(_)));
    }

    #[test]
    fn nested_objects_merge_one_level() {
        let merged = merge_layers(&[
            layer("template", json!({"loaders": {"babel": {"a": 1}, "sass": {"x": 1}}})),
            layer("caller", json!({"loaders": {"babel": {"b": 2}}})),
        ])
        .unwrap();
        assert_eq!(
            merged["loaders"],
            json!({"babel": {"b": 2}, "sass": {"x": 1}})
        );
    }

    #[test]
    fn null_resets_to_default() {
        let merged = merge_layers(&[
            layer("template", json!({"syncStartPath": "./mockup/index.html"})),
            layer("caller", json!({"syncStartPath": null})),
        ])
        .unwrap();
        assert!(!merged.contains_key("syncStartPath"));
    }

    #[test]
    fn layers_must_be_objects() {
        assert!(matches!(
            OptionLayer::new("caller", json!([1, 2])),
            Err(Error::LayerMustBeObject(_))
        ));
        assert!(OptionLayer::new("caller", JsonValue::Null)
            .unwrap()
            .values()
            .is_empty());
    }

    #[test]
    fn unknown_keys_replace() {
        assert_eq!(rule_for("output"), MergeRule::Replace);
        assert_eq!(rule_for("plugins"), MergeRule::Concat);
    }
}
