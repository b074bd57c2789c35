//! Visible/hidden split of an operator's output fields.

use qdistinct_core::schema::Field;

use crate::traits::PlanError;

/// Output fields plus the offset where planner-appended hidden fields start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectList {
    pub result_fields: Vec<Field>,
    pub hidden_field_offset: usize,
}

impl SelectList {
    pub fn new(result_fields: Vec<Field>, hidden_field_offset: usize) -> Result<Self, PlanError> {
        if hidden_field_offset > result_fields.len() {
            return Err(PlanError::Plan(format!(
                "hidden field offset {} exceeds {} result fields",
                hidden_field_offset,
                result_fields.len()
            )));
        }
        Ok(Self {
            result_fields,
            hidden_field_offset,
        })
    }

    /// Fields the caller asked for; these form the distinct key.
    pub fn visible_fields(&self) -> &[Field] {
        &self.result_fields[..self.hidden_field_offset]
    }

    pub fn hidden_fields(&self) -> &[Field] {
        &self.result_fields[self.hidden_field_offset..]
    }
}
