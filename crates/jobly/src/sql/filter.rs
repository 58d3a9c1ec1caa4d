use crate::value::{FilterCriteria, SqlValue};

/// How a single recognized filter key turns into a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// `<column> >= $n` when the value is truthy.
    AtLeast,
    /// `<column> <= $n` when the value is truthy.
    AtMost,
    /// `<column> ILIKE $n` bound to `%value%` when the value is truthy.
    Contains,
    /// The fixed condition, with no bind value, when the value is exactly `true`.
    Flag(&'static str),
}

/// A recognized filter key and the column it constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterRule {
    pub key: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

impl FilterRule {
    pub const fn at_least(key: &'static str, column: &'static str) -> Self {
        Self {
            key,
            column,
            kind: FilterKind::AtLeast,
        }
    }

    pub const fn at_most(key: &'static str, column: &'static str) -> Self {
        Self {
            key,
            column,
            kind: FilterKind::AtMost,
        }
    }

    pub const fn contains(key: &'static str, column: &'static str) -> Self {
        Self {
            key,
            column,
            kind: FilterKind::Contains,
        }
    }

    pub const fn flag(key: &'static str, column: &'static str, condition: &'static str) -> Self {
        Self {
            key,
            column,
            kind: FilterKind::Flag(condition),
        }
    }

    /// Render this rule's condition for `value`, pushing its bind value (if
    /// any) onto `values`. Returns `None` when the rule does not apply.
    fn apply(&self, value: &SqlValue, values: &mut Vec<SqlValue>) -> Option<String> {
        match self.kind {
            FilterKind::AtLeast if value.is_truthy() => {
                values.push(value.clone());
                Some(format!("{} >= ${}", self.column, values.len()))
            }
            FilterKind::AtMost if value.is_truthy() => {
                values.push(value.clone());
                Some(format!("{} <= ${}", self.column, values.len()))
            }
            FilterKind::Contains if value.is_truthy() => {
                values.push(SqlValue::Text(format!("%{value}%")));
                Some(format!("{} ILIKE ${}", self.column, values.len()))
            }
            FilterKind::Flag(condition) if *value == SqlValue::Bool(true) => {
                Some(condition.to_string())
            }
            _ => None,
        }
    }
}

/// A parenthesized `WHERE` condition group plus its bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterClause {
    /// `(a >= $1 AND b ILIKE $2)`, or empty when no filter applied.
    pub where_clause: String,
    /// `values[i]` binds to placeholder `$(i + 1)`.
    pub values: Vec<SqlValue>,
}

impl FilterClause {
    pub fn is_empty(&self) -> bool {
        self.where_clause.is_empty()
    }

    /// ` WHERE (...)` ready to append to a base query, or `""`.
    pub fn to_where_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clause)
        }
    }

    /// The first placeholder index not used by this clause.
    pub fn next_placeholder(&self) -> usize {
        self.values.len() + 1
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Build the `WHERE` condition group for a search.
///
/// `rules` are evaluated in their declared order, whatever order the
/// criteria arrived in; keys without a rule are ignored. Never fails: absent
/// or falsy filters simply produce no condition.
pub fn build_filter_clause(rules: &[FilterRule], criteria: &FilterCriteria) -> FilterClause {
    let mut values = Vec::new();
    let conditions: Vec<String> = rules
        .iter()
        .filter_map(|rule| {
            let value = criteria.get(rule.key)?;
            rule.apply(value, &mut values)
        })
        .collect();

    if conditions.is_empty() {
        return FilterClause::default();
    }

    FilterClause {
        where_clause: format!("({})", conditions.join(" AND ")),
        values,
    }
}
