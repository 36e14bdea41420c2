use crate::utils::error::{CopycatError, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A single subfield of a MARC data field. On the wire it is a single-entry
/// object, e.g. `{"a": "Baird, J. Arthur"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subfield {
    pub code: String,
    pub value: String,
}

impl Subfield {
    pub fn new(code: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

impl Serialize for Subfield {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.code, &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Subfield {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SubfieldVisitor;

        impl<'de> Visitor<'de> for SubfieldVisitor {
            type Value = Subfield;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-entry subfield object")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Subfield, A::Error> {
                let (code, value): (String, String) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::custom("empty subfield object"))?;
                Ok(Subfield { code, value })
            }
        }

        deserializer.deserialize_map(SubfieldVisitor)
    }
}

fn default_indicator() -> String {
    " ".to_string()
}

/// Body of a data field: two one-character indicators and an ordered subfield
/// sequence. `subfields` is `None` when the wire record carried no
/// `subfields` member at all, which embedding treats as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataField {
    #[serde(default = "default_indicator")]
    pub ind1: String,
    #[serde(default = "default_indicator")]
    pub ind2: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfields: Option<Vec<Subfield>>,
}

/// One record field: a 3-character tag mapped to either a scalar control
/// value (conventionally tags below "010") or a [`DataField`]. On the wire a
/// field is a single-entry object keyed by its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub tag: String,
    pub content: FieldContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldContent {
    Control(String),
    Data(DataField),
}

impl Field {
    pub fn control(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content: FieldContent::Control(value.into()),
        }
    }

    pub fn data(
        tag: impl Into<String>,
        ind1: impl Into<String>,
        ind2: impl Into<String>,
        subfields: Vec<Subfield>,
    ) -> Self {
        Self {
            tag: tag.into(),
            content: FieldContent::Data(DataField {
                ind1: ind1.into(),
                ind2: ind2.into(),
                subfields: Some(subfields),
            }),
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match &self.content {
            FieldContent::Control(value) => map.serialize_entry(&self.tag, value)?,
            FieldContent::Data(data) => map.serialize_entry(&self.tag, data)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = Field;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-entry field object keyed by tag")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Field, A::Error> {
                let (tag, value): (String, serde_json::Value) = map
                    .next_entry()?
                    .ok_or_else(|| de::Error::custom("empty field object"))?;
                let content = match value {
                    serde_json::Value::String(s) => FieldContent::Control(s),
                    other => FieldContent::Data(
                        serde_json::from_value(other).map_err(de::Error::custom)?,
                    ),
                };
                Ok(Field { tag, content })
            }
        }

        deserializer.deserialize_map(FieldVisitor)
    }
}

/// MARC-in-JSON record: a leader plus an ordered field sequence. The field
/// sequence is kept in non-decreasing tag order; equal-tag fields stay in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarcRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
    pub fields: Vec<Field>,
}

impl MarcRecord {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            leader: None,
            fields,
        }
    }

    /// Parses a MARC-in-JSON value. A record without a `fields` member is
    /// rejected; an empty field array is accepted.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut obj) = value else {
            return Err(CopycatError::MissingFields);
        };
        let Some(fields_value) = obj.remove("fields") else {
            return Err(CopycatError::MissingFields);
        };
        let fields: Vec<Field> = serde_json::from_value(fields_value)?;
        let leader = match obj.remove("leader") {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        };
        Ok(Self { leader, fields })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }
}

/// Copy cataloging profile: identifies a remote bibliographic target and the
/// embed path / job profile ids to use when importing from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `user[/group] password` for the target, when required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Query template with `$identifier` substituted by the external id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id_query_map: Option<String>,
    /// 7-character MARC path where the internal id is stamped on overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_id_embed_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_job_profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_job_profile_id: Option<String>,
    /// Protocol-specific target options, forwarded to the record source.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub target_options: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Input to the import workflow. Exactly one of `external_identifier` and
/// `record` supplies the bibliographic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub profile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_identifier: Option<String>,
    /// Local instance identifier for the overlay path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_identifier: Option<String>,
    /// Inline record payload; its `json` member holds the MARC-in-JSON record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<serde_json::Value>,
}
