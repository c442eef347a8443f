use rust_decimal::Decimal;

use super::schema::ValidationError;
use super::value::FieldValue;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuleViolation {
    pub code: &'static str,
    pub message: String,
}

impl RuleViolation {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl ValidationError for RuleViolation {
    fn message(&self) -> String {
        self.message.clone()
    }
}

fn text_len(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::Unset => Some(0),
        FieldValue::Text(text) => Some(text.chars().count()),
        FieldValue::List(items) => Some(items.len()),
        FieldValue::Number(_) | FieldValue::Bool(_) => None,
    }
}

pub fn required(
    message: impl Into<String>,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static {
    let message = message.into();
    move |value: &FieldValue| {
        let missing = match value {
            FieldValue::Unset => true,
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Number(_) | FieldValue::Bool(_) => false,
        };
        if missing {
            Err(RuleViolation::new("required", message.clone()))
        } else {
            Ok(())
        }
    }
}

pub fn min_length(
    min: usize,
    message: impl Into<String>,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static {
    let message = message.into();
    move |value: &FieldValue| match text_len(value) {
        Some(len) if len >= min => Ok(()),
        _ => Err(RuleViolation::new("min_length", message.clone())),
    }
}

pub fn max_length(
    max: usize,
    message: impl Into<String>,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static {
    let message = message.into();
    move |value: &FieldValue| match text_len(value) {
        Some(len) if len <= max => Ok(()),
        _ => Err(RuleViolation::new("max_length", message.clone())),
    }
}

pub fn number_between(
    min: impl Into<Decimal>,
    max: impl Into<Decimal>,
    message: impl Into<String>,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static {
    let (min, max) = (min.into(), max.into());
    let message = message.into();
    move |value: &FieldValue| match value.as_number() {
        Some(number) if number >= min && number <= max => Ok(()),
        _ => Err(RuleViolation::new("number_between", message.clone())),
    }
}

pub fn contains(
    needle: impl Into<String>,
    message: impl Into<String>,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static {
    let needle = needle.into();
    let message = message.into();
    move |value: &FieldValue| match value.as_text() {
        Some(text) if text.contains(needle.as_str()) => Ok(()),
        _ => Err(RuleViolation::new("contains", message.clone())),
    }
}

pub fn custom<P>(
    code: &'static str,
    message: impl Into<String>,
    predicate: P,
) -> impl Fn(&FieldValue) -> Result<(), RuleViolation> + Send + Sync + 'static
where
    P: Fn(&FieldValue) -> bool + Send + Sync + 'static,
{
    let message = message.into();
    move |value: &FieldValue| {
        if predicate(value) {
            Ok(())
        } else {
            Err(RuleViolation::new(code, message.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_rejects_unset_blank_and_empty_list() {
        let rule = required("required");
        assert!(rule(&FieldValue::Unset).is_err());
        assert!(rule(&FieldValue::from("   ")).is_err());
        assert!(rule(&FieldValue::List(Vec::new())).is_err());
        assert!(rule(&FieldValue::from("x")).is_ok());
        assert!(rule(&FieldValue::Bool(false)).is_ok());
    }

    #[test]
    fn length_rules_count_characters_not_bytes() {
        let min = min_length(3, "too short");
        assert!(min(&FieldValue::from("äöü")).is_ok());
        assert!(min(&FieldValue::from("ab")).is_err());
        assert!(min(&FieldValue::Unset).is_err());
        assert_eq!(min(&FieldValue::from("")).unwrap_err().code, "min_length");

        let max = max_length(2, "too long");
        assert!(max(&FieldValue::from("ab")).is_ok());
        assert!(max(&FieldValue::from("abc")).is_err());
        assert!(max(&FieldValue::Number(Decimal::ONE)).is_err());
    }

    #[test]
    fn number_between_is_inclusive_and_rejects_non_numbers() {
        let rule = number_between(18, 99, "out of range");
        assert!(rule(&FieldValue::from(18)).is_ok());
        assert!(rule(&FieldValue::from(99)).is_ok());
        assert!(rule(&FieldValue::from(17)).is_err());
        assert!(rule(&FieldValue::from(100)).is_err());
        assert!(rule(&FieldValue::Unset).is_err());
        assert!(rule(&FieldValue::from("24")).is_err());
    }

    #[test]
    fn custom_rule_reports_its_code() {
        let rule = custom("even", "must be even", |value: &FieldValue| {
            value
                .as_number()
                .is_some_and(|number| (number % Decimal::TWO).is_zero())
        });
        assert!(rule(&FieldValue::from(4)).is_ok());
        let violation = rule(&FieldValue::from(3)).unwrap_err();
        assert_eq!(violation.code, "even");
        assert_eq!(violation.message(), "must be even");
    }
}
