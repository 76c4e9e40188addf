//! Attribute field metadata for the feature inspection popup.
//!
//! These are display hints only; they never change how geometry is drawn.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a field is labelled in the feature popup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelMode {
    #[default]
    #[serde(rename = "no label")]
    NoLabel,
    #[serde(rename = "inline label - visible with data")]
    InlineWithData,
    #[serde(rename = "header label - visible with data")]
    HeaderWithData,
    #[serde(rename = "inline label - always visible")]
    InlineAlways,
    #[serde(rename = "header label - always visible")]
    HeaderAlways,
    /// Field is left out of the popup entirely
    #[serde(rename = "hidden field")]
    Hidden,
}

impl LabelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMode::NoLabel => "no label",
            LabelMode::InlineWithData => "inline label - visible with data",
            LabelMode::HeaderWithData => "header label - visible with data",
            LabelMode::InlineAlways => "inline label - always visible",
            LabelMode::HeaderAlways => "header label - always visible",
            LabelMode::Hidden => "hidden field",
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            LabelMode::NoLabel,
            LabelMode::InlineWithData,
            LabelMode::HeaderWithData,
            LabelMode::InlineAlways,
            LabelMode::HeaderAlways,
            LabelMode::Hidden,
        ]
        .into_iter()
        .find(|mode| mode.as_str() == s.trim())
        .ok_or_else(|| format!("Unknown label mode: {}", s))
    }
}

/// Hints for one attribute field.
///
/// Each hint is `None` unless it was given explicitly, so the viewer can
/// tell "not configured" apart from a value that happens to be the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldHints {
    /// Name shown instead of the raw field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelMode>,
    /// Editor widget name (e.g. `TextEdit`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

/// Per-layer field metadata, in the order the fields were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMetadata {
    fields: IndexMap<String, FieldHints>,
}

impl FieldMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the alias, label and widget mappings into one record per field.
    ///
    /// Keys are the union of the three mappings in first-seen order. A field
    /// missing from one mapping leaves that hint unset.
    pub fn from_parallel(
        aliases: &[(&str, &str)],
        labels: &[(&str, LabelMode)],
        widgets: &[(&str, &str)],
    ) -> Self {
        let mut metadata = Self::new();
        for (name, alias) in aliases {
            metadata.entry(name).alias = Some(alias.to_string());
        }
        for (name, label) in labels {
            metadata.entry(name).label = Some(*label);
        }
        for (name, widget) in widgets {
            metadata.entry(name).widget = Some(widget.to_string());
        }
        metadata
    }

    fn entry(&mut self, name: &str) -> &mut FieldHints {
        self.fields.entry(name.to_string()).or_default()
    }

    pub fn insert(&mut self, name: impl Into<String>, hints: FieldHints) {
        self.fields.insert(name.into(), hints);
    }

    pub fn get(&self, name: &str) -> Option<&FieldHints> {
        self.fields.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.get(name)?.alias.as_deref()
    }

    pub fn label_mode(&self, name: &str) -> Option<LabelMode> {
        self.get(name)?.label
    }

    pub fn widget(&self, name: &str) -> Option<&str> {
        self.get(name)?.widget.as_deref()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldHints)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parallel_maps_merge_by_field() {
        let metadata = FieldMetadata::from_parallel(
            &[("NOM", "NOM"), ("NUMPOINTS", "NUMPOINTS")],
            &[
                ("NOM", LabelMode::InlineWithData),
                ("NUMPOINTS", LabelMode::InlineWithData),
            ],
            &[("NOM", "TextEdit"), ("NUMPOINTS", "TextEdit")],
        );

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.alias("NOM"), Some("NOM"));
        assert_eq!(
            metadata.label_mode("NUMPOINTS"),
            Some(LabelMode::InlineWithData)
        );
        assert_eq!(metadata.widget("NOM"), Some("TextEdit"));
        assert_eq!(metadata.alias("MISSING"), None);
    }

    #[test]
    fn test_keys_are_exactly_those_passed_in_order() {
        let metadata = FieldMetadata::from_parallel(
            &[("Z_MOYEN", "Altitude"), ("CODE_COM", "CODE_COM")],
            &[("INSEE_COM", LabelMode::NoLabel)],
            &[("Z_MOYEN", "")],
        );

        let names: Vec<&str> = metadata.field_names().collect();
        assert_eq!(names, vec!["Z_MOYEN", "CODE_COM", "INSEE_COM"]);
        assert_eq!(metadata.alias("Z_MOYEN"), Some("Altitude"));
        assert_eq!(metadata.widget("Z_MOYEN"), Some(""));
        assert_eq!(metadata.label_mode("INSEE_COM"), Some(LabelMode::NoLabel));

        // Hints missing from a mapping stay unset.
        assert_eq!(metadata.alias("INSEE_COM"), None);
        assert_eq!(metadata.label_mode("CODE_COM"), None);
        assert_eq!(metadata.widget("CODE_COM"), None);
        assert_eq!(metadata.get("CODE_COM").unwrap().label, None);
    }

    #[test]
    fn test_unset_hints_are_left_out_of_json() {
        let metadata = FieldMetadata::from_parallel(
            &[("NOM", "Commune")],
            &[("POP", LabelMode::NoLabel)],
            &[],
        );
        let value = serde_json::to_value(&metadata).unwrap();

        assert_eq!(value["NOM"], serde_json::json!({"alias": "Commune"}));
        assert_eq!(value["POP"], serde_json::json!({"label": "no label"}));
    }

    #[test]
    fn test_label_mode_strings() {
        assert_eq!(
            "inline label - visible with data".parse::<LabelMode>(),
            Ok(LabelMode::InlineWithData)
        );
        assert_eq!("hidden field".parse::<LabelMode>(), Ok(LabelMode::Hidden));
        assert!("sideways label".parse::<LabelMode>().is_err());
        assert_eq!(
            serde_json::to_value(LabelMode::NoLabel).unwrap(),
            serde_json::json!("no label")
        );
    }

    #[test]
    fn test_serializes_as_ordered_object() {
        let metadata = FieldMetadata::from_parallel(&[("B", "b"), ("A", "a")], &[], &[]);
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.find("\"B\"").unwrap() < json.find("\"A\"").unwrap());
    }
}
