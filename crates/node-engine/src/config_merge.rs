// SPDX-FileCopyrightText: Copyright © 2024-2026 Naptha Node Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Deployment config merge: caller-set keys win, nested objects merge
//! recursively, lists replace wholesale.
//!
//! `original_source/node/module_manager.py::merge_config` recurses into
//! lists too; this implementation follows the authoritative contract
//! recorded in `SPEC_FULL.md`'s Design Notes instead (lists replace).

use serde_json::Value;

/// Merges `input` over `default`. `default` supplies every key the caller
/// didn't set; `input` wins wherever both define a key.
pub fn merge(default: &Value, input: &Value) -> Value {
    match (default, input) {
        (Value::Object(default_map), Value::Object(input_map)) => {
            let mut merged = default_map.clone();
            for (key, input_value) in input_map {
                let merged_value = match merged.get(key) {
                    Some(default_value) => merge(default_value, input_value),
                    None => input_value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        // Any other combination, including lists, takes the caller's
        // value wholesale; it only falls back to the default when the
        // caller left the key absent entirely, which the object branch
        // above already handles.
        (_, input_value) => input_value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caller_value_wins_on_shared_scalar_key() {
        let default = json!({"temperature": 0.2, "model": "gpt-4"});
        let input = json!({"temperature": 0.9});
        let merged = merge(&default, &input);
        assert_eq!(merged["temperature"], 0.9);
        assert_eq!(merged["model"], "gpt-4");
    }

    #[test]
    fn nested_objects_merge_recursively() {
        let default = json!({"llm": {"model": "gpt-4", "temperature": 0.2}});
        let input = json!({"llm": {"temperature": 0.9}});
        let merged = merge(&default, &input);
        assert_eq!(merged["llm"]["model"], "gpt-4");
        assert_eq!(merged["llm"]["temperature"], 0.9);
    }

    #[test]
    fn lists_replace_wholesale_rather_than_concatenate() {
        let default = json!({"tools": ["a", "b", "c"]});
        let input = json!({"tools": ["x"]});
        let merged = merge(&default, &input);
        assert_eq!(merged["tools"], json!(["x"]));
    }

    #[test]
    fn unset_keys_fall_through_to_default() {
        let default = json!({"a": 1, "b": 2});
        let input = json!({"a": 99});
        let merged = merge(&default, &input);
        assert_eq!(merged, json!({"a": 99, "b": 2}));
    }
}
