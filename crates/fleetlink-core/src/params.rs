//! Flight parameter metadata.
//!
//! Parses the autopilot's parameter definition document
//! (`{category: {PARAM: {DisplayName, Description, Units, Range, Values, Bitmask}}}`)
//! into a flat lookup table for the parameter editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const NO_DESCRIPTION: &str = "No description available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub unit: Option<String>,
    pub range: Option<(f64, f64)>,
    /// Enumerated values, raw value -> label
    pub values: Option<BTreeMap<String, String>>,
    pub bitmask: Option<BTreeMap<String, String>>,
}

/// Flatten a two-level definition document. Entries that are not objects are
/// skipped.
pub fn parse_parameter_definitions(document: &Value) -> BTreeMap<String, ParamDefinition> {
    let mut definitions = BTreeMap::new();
    let Some(categories) = document.as_object() else {
        return definitions;
    };

    for params in categories.values().filter_map(Value::as_object) {
        for (name, def) in params {
            let Some(def) = def.as_object() else {
                continue;
            };
            let text = |key: &str| def.get(key).and_then(Value::as_str).map(str::to_string);

            definitions.insert(
                name.clone(),
                ParamDefinition {
                    name: name.clone(),
                    display_name: text("DisplayName").unwrap_or_else(|| name.clone()),
                    description: text("Description").unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                    unit: text("Units"),
                    range: def.get("Range").and_then(parse_range),
                    values: def.get("Values").and_then(string_map),
                    bitmask: def.get("Bitmask").and_then(string_map),
                },
            );
        }
    }

    definitions
}

fn parse_range(range: &Value) -> Option<(f64, f64)> {
    let bound = |key: &str| match range.get(key)? {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    Some((bound("low")?, bound("high")?))
}

fn string_map(value: &Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object()?;
    Some(
        object
            .iter()
            .map(|(k, v)| {
                let label = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                (k.clone(), label)
            })
            .collect(),
    )
}

pub fn parameter_unit<'a>(name: &str, defs: &'a BTreeMap<String, ParamDefinition>) -> &'a str {
    defs.get(name).and_then(|d| d.unit.as_deref()).unwrap_or("")
}

pub fn parameter_range(name: &str, defs: &BTreeMap<String, ParamDefinition>) -> Option<(f64, f64)> {
    defs.get(name).and_then(|d| d.range)
}

pub fn parameter_description<'a>(name: &str, defs: &'a BTreeMap<String, ParamDefinition>) -> &'a str {
    defs.get(name).map_or(NO_DESCRIPTION, |d| d.description.as_str())
}

pub fn has_dropdown_values(name: &str, defs: &BTreeMap<String, ParamDefinition>) -> bool {
    defs.get(name)
        .and_then(|d| d.values.as_ref())
        .is_some_and(|v| !v.is_empty())
}

/// `(value, "<label> (<value>)")` pairs for an enumerated parameter.
pub fn dropdown_options(name: &str, defs: &BTreeMap<String, ParamDefinition>) -> Vec<(String, String)> {
    let Some(values) = defs.get(name).and_then(|d| d.values.as_ref()) else {
        return Vec::new();
    };
    values
        .iter()
        .map(|(value, label)| (value.clone(), format!("{label} ({value})")))
        .collect()
}

pub fn dropdown_display_value(name: &str, value: &str, defs: &BTreeMap<String, ParamDefinition>) -> String {
    match defs
        .get(name)
        .and_then(|d| d.values.as_ref())
        .and_then(|v| v.get(value))
    {
        Some(label) => format!("{label} ({value})"),
        None => value.to_string(),
    }
}
