//! Deep merge for configuration documents.
//!
//! Applied recursively key-by-key: nested maps merge, sequences concatenate
//! (later after earlier), and anything else is replaced entirely by the later
//! value. Scalars and map/sequence/scalar mismatches always take the later
//! value, including explicit nulls.

use serde_json::Value;

/// Deep merge two documents, with `overlay` taking precedence over `base`.
///
/// - Maps are merged recursively: overlay keys win on collision
/// - Sequences are concatenated, overlay elements after base elements
/// - Everything else (scalars, mismatched kinds, nulls) is replaced by overlay
///
/// # Example
/// ```
/// use serde_json::json;
/// use strata::merge::deep_merge;
///
/// let base = json!({ "web-server": { "port": 8080, "pool-size": 25 } });
/// let overlay = json!({ "web-server": { "port": 9999 } });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result, json!({ "web-server": { "port": 9999, "pool-size": 25 } }));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (Value::Array(mut base_items), Value::Array(overlay_items)) => {
            base_items.extend(overlay_items);
            Value::Array(base_items)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an ordered sequence of documents, later documents taking precedence.
///
/// A left fold of [`deep_merge`] seeded with `Value::Null`, so a single
/// document merges to itself and an empty sequence merges to null.
pub fn deep_merge_all(documents: impl IntoIterator<Item = Value>) -> Value {
    documents.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_simple_maps() {
        let base = json!({"a": 1, "b": 2});
        let overlay = json!({"b": 3, "c": 4});
        assert_eq!(deep_merge(base, overlay), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn merge_nested_maps_preserves_siblings() {
        let base = json!({"web-server": {"port": 8080, "pool-size": 25}});
        let overlay = json!({"web-server": {"port": 9999}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"web-server": {"port": 9999, "pool-size": 25}})
        );
    }

    #[test]
    fn sequences_concatenate() {
        let base = json!({"tags": ["a"]});
        let overlay = json!({"tags": ["b"]});
        assert_eq!(deep_merge(base, overlay), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn scalar_replaces_scalar() {
        assert_eq!(deep_merge(json!(1), json!(2)), json!(2));
        assert_eq!(deep_merge(json!("x"), json!("y")), json!("y"));
    }

    #[test]
    fn mismatched_kinds_take_later_value() {
        assert_eq!(
            deep_merge(json!({"v": {"nested": true}}), json!({"v": 42})),
            json!({"v": 42})
        );
        assert_eq!(
            deep_merge(json!({"v": [1, 2]}), json!({"v": {"m": 1}})),
            json!({"v": {"m": 1}})
        );
    }

    #[test]
    fn later_null_wins() {
        assert_eq!(
            deep_merge(json!({"a": 1}), json!({"a": null})),
            json!({"a": null})
        );
    }

    #[test]
    fn single_document_is_identity() {
        let doc = json!({"a": {"b": [1, 2]}, "c": "x"});
        assert_eq!(deep_merge_all([doc.clone()]), doc);
    }

    #[test]
    fn merge_all_equals_left_fold() {
        let a = json!({"x": {"p": 1}, "tags": ["a"]});
        let b = json!({"x": {"q": 2}, "tags": ["b"]});
        let c = json!({"x": {"p": 3}});
        let folded = deep_merge(deep_merge(a.clone(), b.clone()), c.clone());
        assert_eq!(deep_merge_all([a, b, c]), folded);
    }

    #[test]
    fn deep_nested_merge() {
        let base = json!({"l1": {"l2": {"l3": {"a": 1, "b": 2}}}});
        let overlay = json!({"l1": {"l2": {"l3": {"b": 3, "c": 4}}}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"l1": {"l2": {"l3": {"a": 1, "b": 3, "c": 4}}}})
        );
    }
}
