//! Query result rows.

use scriptorium_core::ScriptoriumError;

use crate::value::Value;

/// A single result row: column names plus values, in query order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row from parallel column and value vectors.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns the value for the named column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Returns the integer value for the named column.
    ///
    /// # Errors
    ///
    /// Returns a database error if the column is absent or not an integer.
    pub fn get_int(&self, column: &str) -> Result<i64, ScriptoriumError> {
        self.get(column)
            .and_then(Value::as_int)
            .ok_or_else(|| {
                ScriptoriumError::DatabaseError(format!("No integer column '{column}' in row"))
            })
    }

    /// Returns the text value for the named column.
    ///
    /// # Errors
    ///
    /// Returns a database error if the column is absent or not text.
    pub fn get_str(&self, column: &str) -> Result<&str, ScriptoriumError> {
        self.get(column)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ScriptoriumError::DatabaseError(format!("No text column '{column}' in row"))
            })
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(
            vec!["id".to_string(), "title".to_string()],
            vec![Value::Int(1), Value::String("Default".to_string())],
        )
    }

    #[test]
    fn test_get() {
        let r = row();
        assert_eq!(r.get("id"), Some(&Value::Int(1)));
        assert!(r.get("missing").is_none());
    }

    #[test]
    fn test_typed_getters() {
        let r = row();
        assert_eq!(r.get_int("id").unwrap(), 1);
        assert_eq!(r.get_str("title").unwrap(), "Default");
        assert!(r.get_int("title").is_err());
        assert!(r.get_str("missing").is_err());
    }
}
