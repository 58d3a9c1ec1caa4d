//! Schema-driven payload validation.
//!
//! Payloads (creates, partial updates and search filters) are checked here
//! before they reach the SQL builders: unknown keys, missing required keys
//! and type mismatches all become [`ValidationErrors`].

use crate::changeset::{ValidationCode, ValidationError, ValidationErrors};
use crate::value::SqlValue;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

/// Best-effort email validation.
///
/// This is intentionally not fully RFC-compliant.
pub fn is_email(s: &str) -> bool {
    static EMAIL_RE: OnceLock<regex::Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| {
            regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid built-in email regex")
        })
        .is_match(s)
}

pub fn is_url(s: &str) -> bool {
    url::Url::parse(s).is_ok()
}

/// Expected shape of a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// A string whose length (in chars) lies within the bounds.
    Text { min: usize, max: Option<usize> },
    /// A whole number within the optional bounds.
    Integer { min: Option<i64>, max: Option<i64> },
    /// A fraction in `[0, 1]`, given as a number or a decimal string such as
    /// `"0.52"`.
    Fraction,
    Boolean,
    Email,
    Url,
}

/// One recognized key of a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
}

impl FieldSpec {
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            nullable: false,
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn check(&self, value: &SqlValue) -> Option<ValidationError> {
        let err = |code, message: String| Some(ValidationError::new(self.name, code, message));

        if value.is_null() {
            return if self.nullable {
                None
            } else {
                err(ValidationCode::Type, "must not be null".to_string())
            };
        }

        match self.kind {
            FieldKind::Text { min, max } => {
                let Some(s) = value.as_str() else {
                    return err(ValidationCode::Type, type_message("string", value));
                };
                let len = s.chars().count();
                if len < min {
                    return err(
                        ValidationCode::Len,
                        format!("does not meet minimum length of {min}"),
                    );
                }
                match max {
                    Some(max) if len > max => err(
                        ValidationCode::Len,
                        format!("does not meet maximum length of {max}"),
                    ),
                    _ => None,
                }
            }
            FieldKind::Integer { min, max } => {
                let Some(i) = value.as_i64() else {
                    return err(ValidationCode::Type, type_message("integer", value));
                };
                match (min, max) {
                    (Some(min), _) if i < min => err(
                        ValidationCode::Range,
                        format!("must be greater than or equal to {min}"),
                    ),
                    (_, Some(max)) if i > max => err(
                        ValidationCode::Range,
                        format!("must be less than or equal to {max}"),
                    ),
                    _ => None,
                }
            }
            FieldKind::Fraction => {
                // Parsed exactly as the NUMERIC encoder will parse it.
                let parsed = match value {
                    SqlValue::Text(s) => Decimal::from_str(s).ok(),
                    SqlValue::Int(i) => Some(Decimal::from(*i)),
                    SqlValue::Float(f) => Decimal::try_from(*f).ok(),
                    _ => None,
                };
                match parsed {
                    None => err(ValidationCode::Type, type_message("numeric", value)),
                    Some(d) if d < Decimal::ZERO || d > Decimal::ONE => err(
                        ValidationCode::Range,
                        "must be between 0 and 1".to_string(),
                    ),
                    Some(_) => None,
                }
            }
            FieldKind::Boolean => match value {
                SqlValue::Bool(_) => None,
                other => err(ValidationCode::Type, type_message("boolean", other)),
            },
            FieldKind::Email => match value.as_str() {
                Some(s) if is_email(s) => None,
                Some(_) => err(
                    ValidationCode::Email,
                    "is not a valid email address".to_string(),
                ),
                None => err(ValidationCode::Type, type_message("string", value)),
            },
            FieldKind::Url => match value.as_str() {
                Some(s) if is_url(s) => None,
                Some(_) => err(ValidationCode::Url, "is not a valid url".to_string()),
                None => err(ValidationCode::Type, type_message("string", value)),
            },
        }
    }
}

fn type_message(expected: &str, got: &SqlValue) -> String {
    format!("is not of a type(s) {expected} (got {})", got.type_name())
}

/// The set of keys a payload may carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// Reject a payload with no keys at all.
    pub min_properties: usize,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate `payload` and collect every problem found.
    pub fn validate<'a>(
        &self,
        payload: impl IntoIterator<Item = (&'a str, &'a SqlValue)>,
    ) -> Result<(), ValidationErrors> {
        let mut errs = ValidationErrors::default();
        let mut seen = Vec::new();

        for (key, value) in payload {
            seen.push(key);
            match self.field(key) {
                Some(spec) => {
                    if let Some(e) = spec.check(value) {
                        errs.push(e);
                    }
                }
                None => errs.push(ValidationError::new(
                    key,
                    ValidationCode::Unknown,
                    "is not allowed to have the additional property",
                )),
            }
        }

        for spec in self.fields.iter().filter(|f| f.required) {
            if !seen.contains(&spec.name) {
                errs.push(ValidationError::new(
                    spec.name,
                    ValidationCode::Required,
                    "is required",
                ));
            }
        }

        if seen.len() < self.min_properties {
            errs.push(ValidationError::new(
                self.name,
                ValidationCode::Custom("min_properties".to_string()),
                format!(
                    "does not meet minimum property count of {}",
                    self.min_properties
                ),
            ));
        }

        errs.into_result()
    }
}

const HANDLE: FieldKind = FieldKind::Text {
    min: 1,
    max: Some(25),
};
const NAME: FieldKind = FieldKind::Text {
    min: 1,
    max: Some(100),
};
const ANY_TEXT: FieldKind = FieldKind::Text { min: 0, max: None };
// Stored in INTEGER columns.
const NON_NEGATIVE: FieldKind = FieldKind::Integer {
    min: Some(0),
    max: Some(i32::MAX as i64),
};

pub const COMPANY_NEW: Schema = Schema {
    name: "companyNew",
    fields: &[
        FieldSpec::required("handle", HANDLE),
        FieldSpec::required("name", NAME),
        FieldSpec::required("description", ANY_TEXT),
        FieldSpec::optional("numEmployees", NON_NEGATIVE).nullable(),
        FieldSpec::optional("logoUrl", FieldKind::Url).nullable(),
    ],
    min_properties: 0,
};

pub const COMPANY_UPDATE: Schema = Schema {
    name: "companyUpdate",
    fields: &[
        FieldSpec::optional("name", NAME),
        FieldSpec::optional("description", ANY_TEXT),
        FieldSpec::optional("numEmployees", NON_NEGATIVE).nullable(),
        FieldSpec::optional("logoUrl", FieldKind::Url).nullable(),
    ],
    min_properties: 1,
};

pub const COMPANY_FILTER: Schema = Schema {
    name: "companyFilter",
    fields: &[
        FieldSpec::optional("minEmployees", NON_NEGATIVE),
        FieldSpec::optional("maxEmployees", NON_NEGATIVE),
        FieldSpec::optional("nameLike", ANY_TEXT),
    ],
    min_properties: 0,
};

pub const JOB_NEW: Schema = Schema {
    name: "jobNew",
    fields: &[
        FieldSpec::required("title", NAME),
        FieldSpec::optional("salary", NON_NEGATIVE).nullable(),
        FieldSpec::optional("equity", FieldKind::Fraction).nullable(),
        FieldSpec::required("companyHandle", HANDLE),
    ],
    min_properties: 0,
};

pub const JOB_UPDATE: Schema = Schema {
    name: "jobUpdate",
    fields: &[
        FieldSpec::optional("title", NAME),
        FieldSpec::optional("salary", NON_NEGATIVE).nullable(),
        FieldSpec::optional("equity", FieldKind::Fraction).nullable(),
    ],
    min_properties: 1,
};

pub const JOB_FILTER: Schema = Schema {
    name: "jobFilter",
    fields: &[
        FieldSpec::optional("minSalary", NON_NEGATIVE),
        FieldSpec::optional("title", ANY_TEXT),
        FieldSpec::optional("hasEquity", FieldKind::Boolean),
    ],
    min_properties: 0,
};

pub const USER_NEW: Schema = Schema {
    name: "userNew",
    fields: &[
        FieldSpec::required("username", HANDLE),
        FieldSpec::required("firstName", FieldKind::Text { min: 1, max: Some(30) }),
        FieldSpec::required("lastName", FieldKind::Text { min: 1, max: Some(30) }),
        FieldSpec::required("email", FieldKind::Email),
        FieldSpec::optional("isAdmin", FieldKind::Boolean),
    ],
    min_properties: 0,
};

pub const USER_UPDATE: Schema = Schema {
    name: "userUpdate",
    fields: &[
        FieldSpec::optional("firstName", FieldKind::Text { min: 1, max: Some(30) }),
        FieldSpec::optional("lastName", FieldKind::Text { min: 1, max: Some(30) }),
        FieldSpec::optional("email", FieldKind::Email),
        FieldSpec::optional("isAdmin", FieldKind::Boolean),
    ],
    min_properties: 1,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FilterCriteria, UpdatePayload};

    #[test]
    fn email_and_url_helpers() {
        assert!(is_email("user1@user.com"));
        assert!(!is_email("not-an-email"));
        assert!(is_url("http://c1.img"));
        assert!(!is_url("c1.img"));
    }

    #[test]
    fn accepts_a_valid_new_job() {
        let payload = UpdatePayload::new()
            .with("title", "new job")
            .with("salary", 60_000)
            .with("equity", "0")
            .with("companyHandle", "c1");
        assert!(JOB_NEW.validate(payload.iter()).is_ok());
    }

    #[test]
    fn reports_missing_required_fields() {
        let payload = UpdatePayload::new().with("title", "new job");
        let errs = JOB_NEW.validate(payload.iter()).unwrap_err();
        assert!(errs.has_field("companyHandle"));
        assert!(errs.has_code(&ValidationCode::Required));
    }

    #[test]
    fn reports_unknown_keys() {
        let criteria = FilterCriteria::new()
            .with("test", "test")
            .with("hasEquity", true);
        let errs = JOB_FILTER.validate(criteria.iter()).unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(errs.has_code(&ValidationCode::Unknown));
        assert!(errs.has_field("test"));
    }

    #[test]
    fn reports_type_mismatches() {
        let payload = UpdatePayload::new()
            .with("salary", "lots")
            .with("equity", "2.5");
        let errs = JOB_UPDATE.validate(payload.iter()).unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(errs.has_code(&ValidationCode::Type));
        assert!(errs.has_code(&ValidationCode::Range));
    }

    #[test]
    fn nullable_fields_accept_null_only_when_declared() {
        let payload = UpdatePayload::new().with("salary", SqlValue::Null);
        assert!(JOB_UPDATE.validate(payload.iter()).is_ok());

        let payload = UpdatePayload::new().with("title", SqlValue::Null);
        assert!(JOB_UPDATE.validate(payload.iter()).is_err());
    }

    #[test]
    fn update_schemas_need_at_least_one_key() {
        let errs = USER_UPDATE
            .validate(UpdatePayload::new().iter())
            .unwrap_err();
        assert!(errs.has_field("userUpdate"));
    }

    #[test]
    fn filter_schemas_accept_empty_criteria() {
        assert!(COMPANY_FILTER.validate(FilterCriteria::new().iter()).is_ok());
    }

    #[test]
    fn text_length_bounds() {
        let payload = UpdatePayload::new().with("handle", "").with("name", "x").with("description", "");
        let errs = COMPANY_NEW.validate(payload.iter()).unwrap_err();
        assert!(errs.has_field("handle"));
        assert!(errs.has_code(&ValidationCode::Len));
    }

    #[test]
    fn user_email_must_be_valid() {
        let payload = UpdatePayload::new().with("email", "not-an-email");
        let errs = USER_UPDATE.validate(payload.iter()).unwrap_err();
        assert!(errs.has_code(&ValidationCode::Email));
    }

    #[test]
    fn equity_must_parse_as_a_decimal_as_given() {
        for ok in ["0.52", "0", "1", "1.0"] {
            let payload = UpdatePayload::new().with("equity", ok);
            assert!(JOB_UPDATE.validate(payload.iter()).is_ok(), "{ok} should pass");
        }
        for bad in [" 0.5", "0.5 ", "half"] {
            let payload = UpdatePayload::new().with("equity", bad);
            let errs = JOB_UPDATE.validate(payload.iter()).unwrap_err();
            assert!(errs.has_code(&ValidationCode::Type), "{bad} should fail");
        }

        let payload = UpdatePayload::new().with("equity", 1.5);
        let errs = JOB_UPDATE.validate(payload.iter()).unwrap_err();
        assert!(errs.has_code(&ValidationCode::Range));
        let payload = UpdatePayload::new().with("equity", "-0.1");
        assert!(JOB_UPDATE.validate(payload.iter()).is_err());
    }

    #[test]
    fn integer_columns_reject_values_beyond_int4() {
        let too_big = i64::from(i32::MAX) + 1;

        let payload = UpdatePayload::new().with("salary", too_big);
        let errs = JOB_UPDATE.validate(payload.iter()).unwrap_err();
        assert!(errs.has_field("salary"));
        assert!(errs.has_code(&ValidationCode::Range));

        let criteria = FilterCriteria::new().with("minSalary", too_big);
        assert!(JOB_FILTER.validate(criteria.iter()).is_err());
        let criteria = FilterCriteria::new().with("maxEmployees", too_big);
        assert!(COMPANY_FILTER.validate(criteria.iter()).is_err());

        let payload = UpdatePayload::new().with("numEmployees", i32::MAX);
        assert!(COMPANY_UPDATE.validate(payload.iter()).is_ok());
    }

    #[test]
    fn accepted_values_encode_for_their_columns() {
        use bytes::BytesMut;
        use tokio_postgres::types::{ToSql, Type};

        let payload = UpdatePayload::new()
            .with("salary", i32::MAX)
            .with("equity", "0.52");
        JOB_UPDATE.validate(payload.iter()).unwrap();

        let mut buf = BytesMut::new();
        assert!(payload.get("salary").unwrap().to_sql(&Type::INT4, &mut buf).is_ok());
        let mut buf = BytesMut::new();
        assert!(payload.get("equity").unwrap().to_sql(&Type::NUMERIC, &mut buf).is_ok());
    }
}
