//! Override reconciliation
//!
//! After a values document has been edited, only the keys that differ from
//! the pack defaults are worth persisting as user-supplied values. Keys that
//! merely repeat a default would otherwise pin that default across future
//! pack upgrades.
//!
//! Rules applied by [`compute_overrides`], for every key of the edited map:
//! - key missing from the defaults: kept as-is
//! - key present and deeply equal to the default: dropped
//! - key present but different, both sides maps: recurse
//! - anything else: the edited value is kept verbatim
//!
//! Keys that only exist in the defaults are never reinstated. Deleting a key
//! while editing means "use the pack default".

use serde_json::{Map, Number, Value as JsonValue};

use crate::values::Values;

/// How the edited document is turned into persisted overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrideMode {
    /// Drop every key whose value equals the pack default
    #[default]
    SubtractDefaults,

    /// Persist the edited document unchanged
    Verbatim,
}

impl OverrideMode {
    /// Mode for a `--disable-default-subtraction` style flag
    pub fn from_disable_flag(disable_default_subtraction: bool) -> Self {
        if disable_default_subtraction {
            Self::Verbatim
        } else {
            Self::SubtractDefaults
        }
    }
}

/// Compute the overrides to persist for `edited` given the pack `defaults`
///
/// Neither input is modified. A document whose root is not a map is returned
/// unchanged.
pub fn compute_overrides(edited: &Values, defaults: &Values) -> Values {
    match (edited.inner(), defaults.inner()) {
        (JsonValue::Object(edited_map), JsonValue::Object(default_map)) => {
            Values(JsonValue::Object(subtract_defaults(edited_map, default_map)))
        }
        (JsonValue::Object(_), _) => edited.clone(),
        _ => {
            tracing::debug!("values document root is not a map, keeping it verbatim");
            edited.clone()
        }
    }
}

/// Apply `mode` to the edited document
pub fn reconcile(edited: &Values, defaults: &Values, mode: OverrideMode) -> Values {
    match mode {
        OverrideMode::SubtractDefaults => compute_overrides(edited, defaults),
        OverrideMode::Verbatim => edited.clone(),
    }
}

fn subtract_defaults(
    edited: &Map<String, JsonValue>,
    defaults: &Map<String, JsonValue>,
) -> Map<String, JsonValue> {
    let mut result = Map::new();

    for (key, value) in edited {
        let Some(default) = defaults.get(key) else {
            result.insert(key.clone(), value.clone());
            continue;
        };

        if values_equal(value, default) {
            continue;
        }

        match (value, default) {
            (JsonValue::Object(inner), JsonValue::Object(inner_default)) => {
                result.insert(
                    key.clone(),
                    JsonValue::Object(subtract_defaults(inner, inner_default)),
                );
            }
            _ => {
                result.insert(key.clone(), value.clone());
            }
        }
    }

    result
}

/// Structural equality between two value trees
///
/// Values of different kinds are never equal: `0`, `false`, `""` and `null`
/// are all distinct. Numbers compare by value, so `1` equals `1.0`.
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x == y,
        (JsonValue::Number(x), JsonValue::Number(y)) => numbers_equal(x, y),
        (JsonValue::String(x), JsonValue::String(y)) => x == y,
        (JsonValue::Array(xs), JsonValue::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (JsonValue::Object(xm), JsonValue::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, x)| ym.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (as_integer(x), as_integer(y)) {
        return a == b;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}
