//! Entity payloads exchanged with the management API
//!
//! Every entity keeps the attributes it does not model in an `extras` map,
//! so a pull followed by a push never drops fields the API added later.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Object type used for component internal tags
pub const COMPONENT_TAG_TYPE: &str = "component";

/// Normalize an entity name for case-insensitive lookups
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept ID arrays holding numbers, numeric strings, blanks or nulls.
///
/// The API sometimes returns `internal_tag_ids` as `["12", "40"]` or as an
/// empty string instead of an array.
fn lenient_ids<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let entries = match raw {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(de::Error::custom(format!("expected an array of IDs, got {}", other)));
        }
    };

    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            Value::Null => {}
            Value::Number(n) => match n.as_u64() {
                Some(id) => ids.push(id),
                None => return Err(de::Error::custom(format!("invalid ID value {}", n))),
            },
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let id = trimmed
                    .parse::<u64>()
                    .map_err(|e| de::Error::custom(format!("invalid integer value {:?}: {}", s, e)))?;
                ids.push(id);
            }
            other => {
                return Err(de::Error::custom(format!("unsupported ID entry {}", other)));
            }
        }
    }
    Ok(ids)
}

/// A component (content type schema)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default)]
    pub schema: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub component_group_uuid: String,

    /// Local-only group reference, resolved to `component_group_uuid` on push
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub component_group_name: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub preset_id: u64,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub internal_tags_list: Vec<InternalTag>,

    #[serde(default, deserialize_with = "lenient_ids", skip_serializing_if = "Vec::is_empty")]
    pub internal_tag_ids: Vec<u64>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub all_presets: Vec<Preset>,

    /// Attributes not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Component {
    /// A component can be synced only with a name and a schema
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.schema.is_some()
    }

    /// Case-insensitive lookup key
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    /// Names of the internal tags this component references, blanks skipped
    pub fn tag_names(&self) -> Vec<String> {
        self.internal_tags_list
            .iter()
            .map(|tag| tag.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// A named default-value payload for a component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub component_id: u64,

    #[serde(default)]
    pub preset: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,

    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Preset {
    /// A preset can be synced only with a name and a preset value
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.preset.is_some()
    }

    /// The owning component, as named inside the preset payload
    pub fn component_name(&self) -> Option<&str> {
        self.preset
            .as_ref()?
            .get("component")?
            .as_str()
            .filter(|name| !name.trim().is_empty())
    }

    /// Case-insensitive lookup key
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// A folder-like grouping of components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentGroup {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub uuid: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<u64>,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub source_uuid: String,
}

impl ComponentGroup {
    /// A group payload for creation by name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A classification label for components
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalTag {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_zero")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub object_type: String,
}

impl InternalTag {
    /// A component tag payload for creation by name
    pub fn component(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            object_type: COMPONENT_TAG_TYPE.to_string(),
        }
    }
}

/// General space settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceOptions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub plan_level: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub default_lang: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub default_lang_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub languages: Vec<LangOption>,

    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

/// A language configured on a space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LangOption {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_default: bool,
}
