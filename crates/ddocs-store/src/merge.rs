use serde_json::Value as JsonValue;

/// Deep-merge `patch` into `target`.
///
/// Objects merge key by key, recursively. Every other value (arrays included)
/// replaces the target wholesale. `null` in the patch is stored as `null`; it
/// does not delete the key.
pub fn deep_merge(target: &mut JsonValue, patch: JsonValue) {
    match (target, patch) {
        (JsonValue::Object(target), JsonValue::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
