//! Structured Tag Comparison
//!
//! Entity, item and tile data arrive as tag compounds (JSON objects). Targets
//! captured by a task are compared against samples either partially (the target
//! is a subset of the sample) or exactly.

use serde_json::{Map, Value};

/// A tag compound: string keys to nested tags
pub type TagCompound = Map<String, Value>;

/// Null, `{}` and `[]` all count as "no tags"
pub fn is_empty_tag(tag: Option<&Value>) -> bool {
    match tag {
        None | Some(Value::Null) => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(list)) => list.is_empty(),
        _ => false,
    }
}

/// Compare a target tag against a sample.
///
/// With `partial`, an empty target matches anything, compound keys missing
/// from the target are ignored and list elements may appear in any order with
/// extras. Without it, both sides must carry the same keys and list lengths.
pub fn compare_tags(target: Option<&Value>, sample: Option<&Value>, partial: bool) -> bool {
    if is_empty_tag(target) {
        return partial || is_empty_tag(sample);
    }

    let (Some(target), Some(sample)) = (target, sample) else {
        return false;
    };

    match (target, sample) {
        (Value::Object(t), Value::Object(s)) => compare_compounds(t, s, partial),
        (Value::Array(t), Value::Array(s)) => {
            if !partial && t.len() != s.len() {
                return false;
            }
            t.iter().all(|te| {
                s.iter()
                    .any(|se| compare_tags(Some(te), Some(se), partial))
            })
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

/// Compound form of [`compare_tags`] for callers holding maps directly
pub fn compound_matches(target: &TagCompound, sample: Option<&TagCompound>, partial: bool) -> bool {
    if target.is_empty() {
        return partial || sample.is_none_or(|s| s.is_empty());
    }
    match sample {
        Some(sample) => compare_compounds(target, sample, partial),
        None => false,
    }
}

fn compare_compounds(target: &TagCompound, sample: &TagCompound, partial: bool) -> bool {
    if !partial && target.len() != sample.len() {
        return false;
    }
    target.iter().all(|(key, value)| {
        sample
            .get(key)
            .is_some_and(|other| compare_tags(Some(value), Some(other), partial))
    })
}
