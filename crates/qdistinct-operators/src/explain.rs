//! Explain output sink.

use qdistinct_core::schema::Field;

/// Receives explain text. Operators write their own lines after their input's.
pub trait Formatter {
    fn format(&mut self, text: &str);
}

impl Formatter for String {
    fn format(&mut self, text: &str) {
        self.push_str(text);
    }
}

/// Render field names as `[a, b, c]`.
pub fn field_names(fields: &[Field]) -> String {
    let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    format!("[{}]", names.join(", "))
}
