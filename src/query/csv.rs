//! CSV rendering in field-descriptor column order.

use crate::config::FieldDescriptor;
use crate::model::{FieldValue, Record};

/// Header row of field names, then one line per record. Rows are joined with `\n`.
pub fn to_csv(records: &[Record], fields: &[FieldDescriptor]) -> String {
    let header = fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(",");
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(header);
    for record in records {
        let row = fields
            .iter()
            .map(|f| csv_cell(record.get(&f.name)))
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }
    lines.join("\n")
}

/// Null is empty; text containing a comma is quoted with inner quotes doubled.
pub fn csv_cell(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => String::new(),
        FieldValue::Text(s) if s.contains(',') => format!("\"{}\"", s.replace('"', "\"\"")),
        other => other.display_string(),
    }
}
