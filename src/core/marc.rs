use crate::domain::model::{DataField, Field, FieldContent, MarcRecord, Subfield};
use crate::utils::error::{CopycatError, Result};

/// Parsed 7-character embed pattern: 3-character tag, two indicator
/// characters (`_` meaning a literal space), `$`, subfield code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPath {
    pub tag: String,
    pub ind1: String,
    pub ind2: String,
    pub code: String,
}

impl EmbedPath {
    pub fn parse(marc_path: &str) -> Result<Self> {
        let chars: Vec<char> = marc_path.chars().collect();
        if chars.len() != 7 {
            return Err(CopycatError::InvalidPattern {
                message: "pattern must be exactly 7 characters (3+2+$+subfield)".to_string(),
            });
        }
        if chars[5] != '$' {
            return Err(CopycatError::InvalidPattern {
                message: "Missing $ in marcPath".to_string(),
            });
        }
        let indicator = |c: char| if c == '_' { ' ' } else { c };
        Ok(Self {
            tag: chars[0..3].iter().collect(),
            ind1: indicator(chars[3]).to_string(),
            ind2: indicator(chars[4]).to_string(),
            code: chars[6].to_string(),
        })
    }
}

/// Embeds `value` into `record` at the position described by `marc_path`.
///
/// A single linear scan over the field sequence. The subfield is appended to
/// the first field whose tag and both indicators match. Otherwise a new data
/// field is inserted after all same-tag fields and before the first field
/// with a greater tag, keeping the sequence sorted by tag. Fails without
/// mutating on any validation error.
pub fn embed_path(record: &mut MarcRecord, marc_path: &str, value: &str) -> Result<()> {
    let path = EmbedPath::parse(marc_path)?;

    let mut insert_at = record.fields.len();
    let mut matched = None;
    for (i, field) in record.fields.iter().enumerate() {
        if field.tag.as_str() > path.tag.as_str() {
            insert_at = i;
            break;
        }
        if field.tag == path.tag {
            let data = match &field.content {
                FieldContent::Data(data) if data.subfields.is_some() => data,
                // control field or data field without a subfield sequence
                _ => return Err(CopycatError::MissingSubfields),
            };
            if data.ind1 == path.ind1 && data.ind2 == path.ind2 {
                matched = Some(i);
                break;
            }
        }
    }

    let subfield = Subfield::new(path.code, value.to_string());
    if let Some(i) = matched {
        if let FieldContent::Data(data) = &mut record.fields[i].content {
            if let Some(subfields) = data.subfields.as_mut() {
                subfields.push(subfield);
            }
        }
        return Ok(());
    }

    record.fields.insert(
        insert_at,
        Field {
            tag: path.tag,
            content: FieldContent::Data(DataField {
                ind1: path.ind1,
                ind2: path.ind2,
                subfields: Some(vec![subfield]),
            }),
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marc1() -> MarcRecord {
        MarcRecord::from_value(json!({
            "leader": "01431cam a2200385 a 4500",
            "fields": [
                {"001": "   70080705 //r83"},
                {"005": "19830916000000.0"},
                {"008": "700101s1963    enk           000 0 eng  "},
                {"050": {"ind1": "0", "ind2": "0", "subfields": [{"a": "BT98 .B24"}]}},
                {"100": {"ind1": "1", "ind2": " ", "subfields": [{"a": "Baird, J. Arthur"}]}},
                {"245": {"ind1": "1", "ind2": "4", "subfields": [
                    {"a": "The justice of God in the teaching of Jesus /"},
                    {"c": "J. Arthur Baird."}
                ]}},
                {"630": {"ind1": "0", "ind2": "0", "subfields": [{"a": "Bible."}]}},
                {"700": {"ind1": "1", "ind2": "0", "subfields": [
                    {"a": "Baird, J. Arthur"},
                    {"q": "(Joseph Arthur)"}
                ]}},
                {"710": {"ind1": "2", "ind2": " ", "subfields": [{"a": "College of Wooster."}]}}
            ]
        }))
        .unwrap()
    }

    fn tags(record: &MarcRecord) -> Vec<&str> {
        record.fields.iter().map(|f| f.tag.as_str()).collect()
    }

    fn assert_sorted(record: &MarcRecord) {
        let tags = tags(record);
        let mut sorted = tags.clone();
        sorted.sort();
        assert_eq!(tags, sorted);
    }

    #[test]
    fn test_embed_bad_pattern() {
        let mut marc = marc1();
        let before = marc.clone();

        let err = embed_path(&mut marc, "000__$", "id1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "pattern must be exactly 7 characters (3+2+$+subfield)"
        );

        let err = embed_path(&mut marc, "000___a", "id1").unwrap_err();
        assert_eq!(err.to_string(), "Missing $ in marcPath");

        // failed embeds never mutate
        assert_eq!(marc, before);
    }

    #[test]
    fn test_embed_at_beginning() {
        let mut marc = marc1();
        embed_path(&mut marc, "000ab$a", "id1").unwrap();
        assert_eq!(
            serde_json::to_value(&marc.fields[0]).unwrap(),
            json!({"000": {"ind1": "a", "ind2": "b", "subfields": [{"a": "id1"}]}})
        );
        assert_eq!(marc.fields[1].tag, "001");
        assert_sorted(&marc);
    }

    #[test]
    fn test_embed_at_middle() {
        let mut marc = marc1();
        embed_path(&mut marc, "650ab$a", "1234").unwrap();
        let n = marc.fields.len();
        assert_eq!(marc.fields[n - 4].tag, "630");
        assert_eq!(
            serde_json::to_value(&marc.fields[n - 3]).unwrap(),
            json!({"650": {"ind1": "a", "ind2": "b", "subfields": [{"a": "1234"}]}})
        );
        assert_eq!(marc.fields[n - 2].tag, "700");
        assert_sorted(&marc);
    }

    #[test]
    fn test_embed_indicator_mismatch_creates_new_field() {
        let mut marc = marc1();
        embed_path(&mut marc, "70020$a", "1234").unwrap();
        let n = marc.fields.len();
        // new field lands after the mismatched 700, before 710
        assert_eq!(marc.fields[n - 3].tag, "700");
        assert_eq!(
            serde_json::to_value(&marc.fields[n - 2]).unwrap(),
            json!({"700": {"ind1": "2", "ind2": "0", "subfields": [{"a": "1234"}]}})
        );
        assert_eq!(marc.fields[n - 1].tag, "710");
        assert_sorted(&marc);
    }

    #[test]
    fn test_embed_at_end() {
        let mut marc = marc1();
        embed_path(&mut marc, "999_1$a", "1234").unwrap();
        assert_eq!(
            serde_json::to_value(marc.fields.last().unwrap()).unwrap(),
            json!({"999": {"ind1": " ", "ind2": "1", "subfields": [{"a": "1234"}]}})
        );
        assert_sorted(&marc);
    }

    #[test]
    fn test_embed_appends_to_matching_field() {
        let mut marc = marc1();
        let n = marc.fields.len();
        embed_path(&mut marc, "70010$a", "1234").unwrap();
        assert_eq!(marc.fields.len(), n);
        assert_eq!(
            serde_json::to_value(&marc.fields[n - 2]).unwrap(),
            json!({"700": {"ind1": "1", "ind2": "0", "subfields": [
                {"a": "Baird, J. Arthur"},
                {"q": "(Joseph Arthur)"},
                {"a": "1234"}
            ]}})
        );
    }

    #[test]
    fn test_embed_twice_inserts_single_field() {
        let mut marc = MarcRecord::new(vec![]);
        embed_path(&mut marc, "650ab$a", "first").unwrap();
        embed_path(&mut marc, "650ab$b", "second").unwrap();
        assert_eq!(marc.fields.len(), 1);
        assert_eq!(
            serde_json::to_value(&marc.fields[0]).unwrap(),
            json!({"650": {"ind1": "a", "ind2": "b", "subfields": [
                {"a": "first"}, {"b": "second"}
            ]}})
        );
    }

    #[test]
    fn test_embed_into_control_field_tag_fails() {
        let mut marc = marc1();
        let err = embed_path(&mut marc, "005__$a", "x").unwrap_err();
        assert_eq!(err.to_string(), "No subfields in marc");
    }

    #[test]
    fn test_embed_keeps_order_over_many_calls() {
        let mut marc = marc1();
        for (path, value) in [
            ("999ff$i", "inst-1"),
            ("035__$a", "(OCoLC)1234"),
            ("65012$a", "Theology"),
            ("700__$a", "Someone else"),
            ("010__$a", "70080705"),
        ] {
            embed_path(&mut marc, path, value).unwrap();
            assert_sorted(&marc);
        }
    }
}
