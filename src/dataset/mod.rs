//! Site records as handed over by the dashboard.
//!
//! A [`Dataset`] is an ordered list of flat [`Record`]s. Field names are not
//! fixed: every analysis discovers them at runtime from the first record's
//! keys, matching substrings such as `lat`, `province` or `technology`.
//!
//! Records keep their field insertion order (`serde_json` is built with
//! `preserve_order`) because duplicate detection compares full
//! serialisations and field discovery walks keys in order.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Bookkeeping column the dashboard adds to each row; never analysed.
pub const ORIGINAL_INDEX_FIELD: &str = "_originalIndex";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One telecommunications site row: field name → scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, mostly for tests and sheet conversion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Raw value of a field. Missing fields are `None`, never an error.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Field names in insertion order, excluding bookkeeping columns.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0
            .keys()
            .map(String::as_str)
            .filter(|k| *k != ORIGINAL_INDEX_FIELD)
    }

    /// `(field, value)` pairs in insertion order, excluding bookkeeping columns.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .filter(|(k, _)| *k != ORIGINAL_INDEX_FIELD)
    }

    /// Number of analysable fields in this record.
    pub fn len(&self) -> usize {
        self.fields().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Display text of a field, if it holds something non-blank.
    ///
    /// Strings are trimmed; numbers and booleans use their JSON rendering.
    /// `null` and blank strings yield `None`.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(value_text)
    }

    /// Numeric value of a field, if it parses as a finite number.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(value_number)
    }

    /// Order-preserving serialisation used for duplicate detection.
    /// Bookkeeping columns are left out, so re-indexed rows still match.
    pub fn fingerprint(&self) -> String {
        let fields: Vec<(&str, &Value)> = self.entries().collect();
        serde_json::to_string(&fields).unwrap_or_default()
    }

    pub(crate) fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Non-blank display text of a scalar value.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Finite numeric value of a scalar; strings must parse in full.
pub fn value_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Whether a slot counts as filled for completeness scoring.
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// Ordered collection of site records currently loaded in the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

/// Shape returned by the Google Sheets `values.get` endpoint.
#[derive(Debug, Deserialize)]
struct SheetValues {
    values: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Field names discovered from the first record.
    pub fn headers(&self) -> Vec<&str> {
        self.records
            .first()
            .map(|r| r.fields().collect())
            .unwrap_or_default()
    }

    /// Headers whose lower-cased name contains any of `needles`.
    pub fn headers_matching(&self, needles: &[&str]) -> Vec<&str> {
        self.headers()
            .into_iter()
            .filter(|h| {
                let lower = h.to_ascii_lowercase();
                needles.iter().any(|n| lower.contains(n))
            })
            .collect()
    }

    /// Distinct non-blank values across `fields`, in first-seen order.
    pub fn distinct_values(&self, fields: &[&str]) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for field in fields {
            for record in &self.records {
                if let Some(text) = record.text(field)
                    && !seen.contains(&text)
                {
                    seen.push(text);
                }
            }
        }
        seen
    }

    /// Parse a dataset from JSON text.
    ///
    /// Accepts either an array of row objects or the Sheets
    /// `{"values": [[header...], [row...]]}` shape.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).context("dataset is not valid JSON")?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(_) => {
                serde_json::from_value(value).context("dataset array must contain objects")
            }
            Value::Object(ref map) if map.contains_key("values") => {
                let sheet: SheetValues =
                    serde_json::from_value(value).context("malformed sheet values")?;
                Ok(Self::from_sheet_rows(sheet.values))
            }
            _ => anyhow::bail!("expected an array of records or a sheet `values` object"),
        }
    }

    /// Build records from a header row followed by data rows.
    ///
    /// Short rows leave their trailing fields absent; extra cells beyond
    /// the header are dropped.
    pub fn from_sheet_rows(rows: Vec<Vec<Value>>) -> Self {
        let mut rows = rows.into_iter();
        let Some(header) = rows.next() else {
            return Self::empty();
        };
        let header: Vec<String> = header
            .iter()
            .map(|h| value_text(h).unwrap_or_default())
            .collect();

        let records = rows
            .map(|row| {
                let mut record = Record::new();
                for (name, cell) in header.iter().zip(row) {
                    record.insert(name.clone(), cell);
                }
                record
            })
            .collect();

        Self { records }
    }

    /// Load a dataset file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_come_from_first_record_and_skip_bookkeeping() {
        let ds = Dataset::from_json_value(json!([
            {"_originalIndex": 0, "Site": "A", "Lat": "17.6"},
            {"Site": "B"}
        ]))
        .unwrap();
        assert_eq!(ds.headers(), vec!["Site", "Lat"]);
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let record = Record::new().with("province", "Cagayan");
        assert_eq!(record.text("lat"), None);
        assert_eq!(record.number("lat"), None);
    }

    #[test]
    fn sheet_values_become_records() {
        let ds = Dataset::from_json_str(
            r#"{"values": [["Site", "Province"], ["A", "Isabela"], ["B"]]}"#,
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].text("Province").as_deref(), Some("Isabela"));
        assert!(ds.records()[1].get("Province").is_none());
    }

    #[test]
    fn number_parsing_requires_whole_string() {
        assert_eq!(value_number(&json!("14.5")), Some(14.5));
        assert_eq!(value_number(&json!(" 3 ")), Some(3.0));
        assert_eq!(value_number(&json!("14.5abc")), None);
        assert_eq!(value_number(&json!("")), None);
        assert_eq!(value_number(&json!("NaN")), None);
        assert_eq!(value_number(&json!(null)), None);
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let a = Record::new().with("a", 1).with("b", 2);
        let b = Record::new().with("b", 2).with("a", 1);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn distinct_values_skip_blanks() {
        let ds = Dataset::new(vec![
            Record::new().with("Tech", "Fiber"),
            Record::new().with("Tech", " "),
            Record::new().with("Tech", "VSAT"),
            Record::new().with("Tech", "Fiber"),
        ]);
        assert_eq!(ds.distinct_values(&["Tech"]), vec!["Fiber", "VSAT"]);
    }

    #[test]
    fn rejects_scalar_json() {
        assert!(Dataset::from_json_str("42").is_err());
    }
}
