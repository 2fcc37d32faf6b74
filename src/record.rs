use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    records: Vec<Record>,
}

impl Catalogue {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl FromIterator<Record> for Catalogue {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn record_id(record: &Record) -> Option<String> {
    record.get("id").and_then(scalar_text)
}

pub fn product_id(record: &Record) -> Option<String> {
    record
        .get("product_id")
        .or_else(|| record.get("productId"))
        .and_then(scalar_text)
}

pub fn project_identifier(record: &Record, prefix: &str) -> Option<String> {
    let id = record_id(record)?;
    let product = product_id(record).unwrap_or_default();
    Some(format!("{prefix} {product}:{id}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn projects_identifier_with_numeric_product() {
        let rec = record(json!({"id": "304fd1fb9a4e48ee", "product_id": 35638}));
        assert_eq!(
            project_identifier(&rec, "ATCC").as_deref(),
            Some("ATCC 35638:304fd1fb9a4e48ee")
        );
    }

    #[test]
    fn projection_requires_id() {
        let rec = record(json!({"product_id": "BAA-1705"}));
        assert_eq!(project_identifier(&rec, "ATCC"), None);
    }

    #[test]
    fn scalar_text_skips_containers() {
        assert_eq!(scalar_text(&json!(true)).as_deref(), Some("true"));
        assert_eq!(scalar_text(&json!(4.5)).as_deref(), Some("4.5"));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!(["a"])), None);
    }
}
