use crate::error::{JoblyError, JoblyResult};
use crate::value::{SqlValue, UpdatePayload};

/// Logical field name → physical column name.
///
/// Fields missing from the table are used as column names unchanged.
pub type TranslationTable = [(&'static str, &'static str)];

/// Resolve the column a logical field is stored in.
pub fn column_for<'a>(table: &'a TranslationTable, field: &'a str) -> &'a str {
    table
        .iter()
        .find(|(logical, _)| *logical == field)
        .map_or(field, |(_, column)| *column)
}

/// The `SET` list of an `UPDATE` plus its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    /// `"col_a"=$1, "col_b"=$2`
    pub set_clause: String,
    /// `values[i]` binds to placeholder `$(i + 1)`.
    pub values: Vec<SqlValue>,
}

impl SetClause {
    /// The first placeholder index not used by this clause.
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Build the `SET` list for a partial update.
///
/// Placeholders are numbered from `$1` in payload order. Column names are
/// quoted verbatim, so the translation table must only ever hold trusted
/// constants.
///
/// # Errors
/// Returns [`JoblyError::BadInput`] if `payload` has no fields.
///
/// # Example
/// ```ignore
/// let payload = UpdatePayload::new().with("firstName", "Aliya").with("age", 32);
/// let set = build_set_clause(&payload, &[("firstName", "first_name")])?;
/// assert_eq!(set.set_clause, r#""first_name"=$1, "age"=$2"#);
/// ```
pub fn build_set_clause(
    payload: &UpdatePayload,
    table: &TranslationTable,
) -> JoblyResult<SetClause> {
    if payload.is_empty() {
        return Err(JoblyError::bad_input("No data"));
    }

    let mut cols = Vec::with_capacity(payload.len());
    let mut values = Vec::with_capacity(payload.len());
    for (idx, (field, value)) in payload.iter().enumerate() {
        cols.push(format!("\"{}\"=${}", column_for(table, field), idx + 1));
        values.push(value.clone());
    }

    Ok(SetClause {
        set_clause: cols.join(", "),
        values,
    })
}
