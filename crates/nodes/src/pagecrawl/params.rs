//! Parameter shapes produced by the form layer, and the adapters that turn
//! them into plain values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::NodeError;

static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static SLUG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

// ---------------------------------------------------------------------------
// Resource locator
// ---------------------------------------------------------------------------

/// How the user picked a resource. Only the picker cares; the request always
/// uses the scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorMode {
    #[default]
    List,
    Id,
    Slug,
    Url,
}

/// `{mode, value}` as produced by a resource picker.
///
/// Deserialises from the object form or from a bare string/number. A bare
/// value may be an ID or a slug, so it is read in list mode and not checked
/// against either pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct ResourceLocator {
    pub mode: LocatorMode,
    pub value: String,
}

impl From<Value> for ResourceLocator {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                let mode = map
                    .get("mode")
                    .cloned()
                    .and_then(|m| serde_json::from_value(m).ok())
                    .unwrap_or_default();
                let value = map.get("value").map(scalar_string).unwrap_or_default();
                Self { mode, value }
            }
            other => Self {
                mode: LocatorMode::List,
                value: scalar_string(&other),
            },
        }
    }
}

impl ResourceLocator {
    pub fn new(mode: LocatorMode, value: impl Into<String>) -> Self {
        Self {
            mode,
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Check the value against the pattern its mode requires.
    pub fn validate(&self, name: &str) -> Result<(), NodeError> {
        let (pattern, reason) = match self.mode {
            LocatorMode::Id => (&*ID_PATTERN, "ID must be a number"),
            LocatorMode::Slug => (
                &*SLUG_PATTERN,
                "slug must contain only lowercase letters, numbers, and hyphens",
            ),
            LocatorMode::List | LocatorMode::Url => return Ok(()),
        };
        if pattern.is_match(&self.value) {
            Ok(())
        } else {
            Err(NodeError::invalid_parameter(name, reason))
        }
    }
}

/// String form of a scalar JSON value; empty for anything else.
pub fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Falsy in the form layer's sense: null, false, zero, empty string.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Fixed collections
// ---------------------------------------------------------------------------

/// Normalise a repeatable form group to a bare ordered list.
///
/// Accepts `{ <item_key>: [...] }`, `{ <item_key>: {...} }` or a bare array.
/// Strings pass through untouched (they are JSON text, parsed later); other
/// objects and `null` become an empty list.
pub fn flatten_collection(value: Value, item_key: &str) -> Value {
    match value {
        Value::Array(_) | Value::String(_) => value,
        Value::Object(mut map) => match map.remove(item_key) {
            Some(Value::Array(items)) => Value::Array(items),
            Some(single @ Value::Object(_)) => Value::Array(vec![single]),
            _ => Value::Array(Vec::new()),
        },
        _ => Value::Array(Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// List responses
// ---------------------------------------------------------------------------

/// The two shapes a list endpoint answers with.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEnvelope {
    /// `[...]`
    Bare(Vec<Value>),
    /// `{ "data": [...] }` or `{ "<key>": [...] }`
    Enveloped { key: String, items: Vec<Value> },
}

impl ListEnvelope {
    /// Recognise a list response. `data` is tried first, then each of
    /// `alternate_keys`, in order.
    pub fn parse(response: Value, alternate_keys: &[&str]) -> Option<Self> {
        match response {
            Value::Array(items) => Some(Self::Bare(items)),
            Value::Object(mut map) => std::iter::once("data")
                .chain(alternate_keys.iter().copied())
                .find_map(|key| match map.remove(key) {
                    Some(Value::Array(items)) => Some(Self::Enveloped {
                        key: key.to_string(),
                        items,
                    }),
                    _ => None,
                }),
            _ => None,
        }
    }

    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Bare(items) | Self::Enveloped { items, .. } => items,
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter bag
// ---------------------------------------------------------------------------

/// Typed read access to one item's parameter bag.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    bag: &'a Map<String, Value>,
}

static EMPTY: Lazy<Map<String, Value>> = Lazy::new(Map::new);

impl<'a> Params<'a> {
    pub fn new(bag: &'a Map<String, Value>) -> Self {
        Self { bag }
    }

    pub fn from_value(value: &'a Value) -> Result<Self, NodeError> {
        value
            .as_object()
            .map(Self::new)
            .ok_or_else(|| NodeError::invalid_parameter("parameters", "expected a JSON object"))
    }

    pub fn raw(&self, name: &str) -> Option<&'a Value> {
        self.bag.get(name).filter(|v| !v.is_null())
    }

    /// Trimmed string value; numbers are rendered.
    pub fn str(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(scalar_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn required_str(&self, name: &str) -> Result<String, NodeError> {
        self.str(name)
            .ok_or_else(|| NodeError::invalid_parameter(name, "a value is required"))
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.raw(name)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64() != Some(0.0)),
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.bool(name).unwrap_or(false)
    }

    /// Non-negative integer, accepting numeric strings.
    pub fn u64(&self, name: &str) -> Result<Option<u64>, NodeError> {
        let Some(raw) = self.raw(name) else {
            return Ok(None);
        };
        let parsed = match raw {
            Value::Number(n) => n.as_u64(),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| NodeError::invalid_parameter(name, "expected a non-negative integer"))
    }

    /// Nested collection; an absent one reads as empty.
    pub fn object(&self, name: &str) -> Params<'a> {
        match self.raw(name) {
            Some(Value::Object(map)) => Params::new(map),
            _ => Params::new(&EMPTY),
        }
    }

    pub fn object_map(&self, name: &str) -> Map<String, Value> {
        self.object(name).bag.clone()
    }

    pub fn locator(&self, name: &str) -> ResourceLocator {
        self.raw(name).cloned().map(ResourceLocator::from).unwrap_or_default()
    }

    /// Scalar value of a required locator, validated against its mode.
    pub fn locator_value(&self, name: &str) -> Result<String, NodeError> {
        let locator = self.locator(name);
        if locator.is_empty() {
            return Err(NodeError::invalid_parameter(name, "a value is required"));
        }
        locator.validate(name)?;
        Ok(locator.value.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn locator_reads_object_and_raw_forms() {
        let by_slug = ResourceLocator::from(json!({ "mode": "slug", "value": "my-page" }));
        assert_eq!(by_slug, ResourceLocator::new(LocatorMode::Slug, "my-page"));

        let numeric = ResourceLocator::from(json!({ "mode": "id", "value": 42 }));
        assert_eq!(numeric.value, "42");

        let raw = ResourceLocator::from(json!(123));
        assert_eq!(raw.mode, LocatorMode::List);
        assert_eq!(raw.value, "123");

        let unknown_mode = ResourceLocator::from(json!({ "mode": "bogus", "value": "x" }));
        assert_eq!(unknown_mode.mode, LocatorMode::List);
    }

    #[test]
    fn locator_validation_follows_mode() {
        assert!(ResourceLocator::new(LocatorMode::Id, "123").validate("pageId").is_ok());
        assert!(ResourceLocator::new(LocatorMode::Id, "12a").validate("pageId").is_err());
        assert!(ResourceLocator::new(LocatorMode::Slug, "my-page-2").validate("pageId").is_ok());
        assert!(ResourceLocator::new(LocatorMode::Slug, "My Page").validate("pageId").is_err());
        assert!(ResourceLocator::new(LocatorMode::List, "Anything Goes").validate("pageId").is_ok());
    }

    #[test]
    fn flatten_accepts_wrapper_or_bare_sequence() {
        let wrapped = json!({ "action": [{ "type": "click" }, { "type": "wait" }] });
        assert_eq!(
            flatten_collection(wrapped, "action"),
            json!([{ "type": "click" }, { "type": "wait" }])
        );
        assert_eq!(
            flatten_collection(json!([{ "type": "click" }]), "action"),
            json!([{ "type": "click" }])
        );
        assert_eq!(
            flatten_collection(json!({ "rule": { "type": "eq" } }), "rule"),
            json!([{ "type": "eq" }])
        );
        assert_eq!(flatten_collection(json!({}), "rule"), json!([]));
        assert_eq!(flatten_collection(Value::Null, "rule"), json!([]));
        assert_eq!(flatten_collection(json!("[1]"), "rule"), json!("[1]"));
    }

    #[test]
    fn list_envelope_prefers_data_then_alternates() {
        let bare = ListEnvelope::parse(json!([1, 2]), &[]).unwrap();
        assert_eq!(bare, ListEnvelope::Bare(vec![json!(1), json!(2)]));

        let data = ListEnvelope::parse(json!({ "data": [1], "folders": [2] }), &["folders"]).unwrap();
        assert_eq!(data.into_items(), vec![json!(1)]);

        let keyed = ListEnvelope::parse(json!({ "folders": [2] }), &["folders"]).unwrap();
        assert!(matches!(&keyed, ListEnvelope::Enveloped { key, .. } if key == "folders"));

        assert!(ListEnvelope::parse(json!({ "message": "nope" }), &["folders"]).is_none());
        assert!(ListEnvelope::parse(json!("text"), &[]).is_none());
    }

    #[test]
    fn falsy_matches_form_semantics() {
        for v in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(is_falsy(&v), "{v} should be falsy");
        }
        for v in [json!(true), json!(3), json!("0"), json!([]), json!({})] {
            assert!(!is_falsy(&v), "{v} should be truthy");
        }
    }

    #[test]
    fn params_coerce_scalars() {
        let bag = json!({
            "limit": "5",
            "returnAll": "false",
            "name": "  Home  ",
            "blank": "",
            "options": { "take": 3 },
            "pageId": { "mode": "id", "value": "12" }
        });
        let params = Params::from_value(&bag).unwrap();
        assert_eq!(params.u64("limit").unwrap(), Some(5));
        assert_eq!(params.bool("returnAll"), Some(false));
        assert_eq!(params.str("name").as_deref(), Some("Home"));
        assert_eq!(params.str("blank"), None);
        assert_eq!(params.object("options").u64("take").unwrap(), Some(3));
        assert_eq!(params.object("missing").u64("take").unwrap(), None);
        assert_eq!(params.locator_value("pageId").unwrap(), "12");
        assert!(params.locator_value("absent").is_err());
        assert!(Params::from_value(&json!({ "limit": -1 })).unwrap().u64("limit").is_err());
    }

    #[test]
    fn bare_page_reference_may_be_id_or_slug() {
        let bag = json!({
            "byId": "42",
            "bySlug": "my-page",
            "explicitId": { "mode": "id", "value": "my-page" }
        });
        let params = Params::from_value(&bag).unwrap();
        assert_eq!(params.locator_value("byId").unwrap(), "42");
        assert_eq!(params.locator_value("bySlug").unwrap(), "my-page");
        assert!(params.locator_value("explicitId").is_err());
    }
}
