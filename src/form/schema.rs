use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::rules::RuleViolation;
use super::value::{FieldKey, FieldValue, FieldValues, FormModel};

pub trait ValidationError: Clone + Send + Sync + 'static {
    fn message(&self) -> String;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldIssues<E>(Vec<(FieldKey, Vec<E>)>);

impl<E> FieldIssues<E> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, key: FieldKey, issue: E) {
        match self.0.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, issues)) => issues.push(issue),
            None => self.0.push((key, vec![issue])),
        }
    }

    pub fn extend(&mut self, key: FieldKey, issues: impl IntoIterator<Item = E>) {
        for issue in issues {
            self.push(key, issue);
        }
    }

    pub fn get(&self, key: FieldKey) -> &[E] {
        self.0
            .iter()
            .find_map(|(existing, issues)| (*existing == key).then_some(issues.as_slice()))
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &[E])> + '_ {
        self.0.iter().map(|(key, issues)| (*key, issues.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|(_, issues)| issues.is_empty())
    }
}

impl<E> Default for FieldIssues<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SchemaOutcome<E> {
    Success,
    Failure(FieldIssues<E>),
}

impl<E> SchemaOutcome<E> {
    pub fn from_issues(issues: FieldIssues<E>) -> Self {
        if issues.is_empty() {
            SchemaOutcome::Success
        } else {
            SchemaOutcome::Failure(issues)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SchemaOutcome::Success)
    }

    pub fn issues_for(&self, key: FieldKey) -> &[E] {
        match self {
            SchemaOutcome::Success => &[],
            SchemaOutcome::Failure(issues) => issues.get(key),
        }
    }
}

pub type BoxedSchemaFuture<'a, E> = Pin<Box<dyn Future<Output = SchemaOutcome<E>> + Send + 'a>>;
pub type BoxedValidationFuture<'a, E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'a>>;

/// Constraint engine behind a form. Failing validation is an outcome, not an
/// error; both entry points may suspend.
pub trait Schema: Send + Sync + 'static {
    type Error: ValidationError;

    fn field_keys(&self) -> Vec<FieldKey>;

    fn default_value(&self, _key: FieldKey) -> FieldValue {
        FieldValue::Unset
    }

    fn validate_all<'a>(&'a self, values: &'a FieldValues) -> BoxedSchemaFuture<'a, Self::Error>;

    fn validate_field<'a>(
        &'a self,
        key: FieldKey,
        value: &'a FieldValue,
    ) -> BoxedSchemaFuture<'a, Self::Error>;
}

pub trait FieldRule<E>: Send + Sync
where
    E: ValidationError,
{
    fn check(&self, value: &FieldValue) -> Result<(), E>;
}

impl<E, F> FieldRule<E> for F
where
    E: ValidationError,
    F: Fn(&FieldValue) -> Result<(), E> + Send + Sync,
{
    fn check(&self, value: &FieldValue) -> Result<(), E> {
        (self)(value)
    }
}

pub trait AsyncFieldRule<E>: Send + Sync
where
    E: ValidationError,
{
    type Fut<'a>: Future<Output = Result<(), E>> + Send + 'a
    where
        Self: 'a;

    fn check<'a>(&'a self, value: &'a FieldValue) -> Self::Fut<'a>;
}

impl<E, F> AsyncFieldRule<E> for F
where
    E: ValidationError,
    F: for<'a> Fn(&'a FieldValue) -> BoxedValidationFuture<'a, E> + Send + Sync,
{
    type Fut<'a>
        = BoxedValidationFuture<'a, E>
    where
        Self: 'a;

    fn check<'a>(&'a self, value: &'a FieldValue) -> Self::Fut<'a> {
        (self)(value)
    }
}

pub trait FormRule<E>: Send + Sync
where
    E: ValidationError,
{
    fn check(&self, values: &FieldValues) -> Vec<(FieldKey, E)>;
}

impl<E, F> FormRule<E> for F
where
    E: ValidationError,
    F: Fn(&FieldValues) -> Vec<(FieldKey, E)> + Send + Sync,
{
    fn check(&self, values: &FieldValues) -> Vec<(FieldKey, E)> {
        (self)(values)
    }
}

type SyncRuleFn<E> = Arc<dyn Fn(&FieldValue) -> Result<(), E> + Send + Sync>;
type AsyncRuleFn<E> = Arc<dyn Fn(FieldValue) -> BoxedValidationFuture<'static, E> + Send + Sync>;
type FormRuleFn<E> = Arc<dyn Fn(&FieldValues) -> Vec<(FieldKey, E)> + Send + Sync>;

static UNSET: FieldValue = FieldValue::Unset;

struct FieldEntry<E> {
    key: FieldKey,
    default: FieldValue,
    rules: Vec<SyncRuleFn<E>>,
    async_rules: Vec<AsyncRuleFn<E>>,
}

// Form rules only run on whole-form validation.
pub struct RuleSchema<E = RuleViolation> {
    fields: Vec<FieldEntry<E>>,
    form_rules: Vec<FormRuleFn<E>>,
}

impl<E> Default for RuleSchema<E>
where
    E: ValidationError,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RuleSchema<E>
where
    E: ValidationError,
{
    pub fn new() -> Self {
        Self {
            fields: Vec::new(),
            form_rules: Vec::new(),
        }
    }

    pub fn for_model<M: FormModel>() -> Self {
        M::field_keys()
            .into_iter()
            .fold(Self::new(), |schema, key| schema.field(key))
    }

    pub fn field(mut self, key: FieldKey) -> Self {
        let _ = self.entry(key);
        self
    }

    pub fn field_with_default(mut self, key: FieldKey, default: impl Into<FieldValue>) -> Self {
        self.entry(key).default = default.into();
        self
    }

    pub fn rule<R>(mut self, key: FieldKey, rule: R) -> Self
    where
        R: FieldRule<E> + 'static,
    {
        let rule = Arc::new(rule);
        let wrapped: SyncRuleFn<E> = Arc::new(move |value: &FieldValue| rule.check(value));
        self.entry(key).rules.push(wrapped);
        self
    }

    pub fn async_rule<R>(mut self, key: FieldKey, rule: R) -> Self
    where
        R: AsyncFieldRule<E> + 'static,
    {
        let rule = Arc::new(rule);
        let wrapped: AsyncRuleFn<E> = Arc::new(move |value: FieldValue| {
            let rule = rule.clone();
            Box::pin(async move { rule.check(&value).await })
        });
        self.entry(key).async_rules.push(wrapped);
        self
    }

    pub fn form_rule<R>(mut self, rule: R) -> Self
    where
        R: FormRule<E> + 'static,
    {
        let rule = Arc::new(rule);
        let wrapped: FormRuleFn<E> = Arc::new(move |values: &FieldValues| rule.check(values));
        self.form_rules.push(wrapped);
        self
    }

    fn entry(&mut self, key: FieldKey) -> &mut FieldEntry<E> {
        let index = match self.fields.iter().position(|entry| entry.key == key) {
            Some(index) => index,
            None => {
                self.fields.push(FieldEntry {
                    key,
                    default: FieldValue::Unset,
                    rules: Vec::new(),
                    async_rules: Vec::new(),
                });
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }

    async fn check_entry(entry: &FieldEntry<E>, value: &FieldValue) -> Vec<E> {
        let mut issues = entry
            .rules
            .iter()
            .filter_map(|rule| rule(value).err())
            .collect::<Vec<_>>();
        for rule in &entry.async_rules {
            if let Err(issue) = rule(value.clone()).await {
                issues.push(issue);
            }
        }
        issues
    }
}

impl<E> Schema for RuleSchema<E>
where
    E: ValidationError,
{
    type Error = E;

    fn field_keys(&self) -> Vec<FieldKey> {
        self.fields.iter().map(|entry| entry.key).collect()
    }

    fn default_value(&self, key: FieldKey) -> FieldValue {
        self.fields
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.default.clone())
            .unwrap_or_default()
    }

    fn validate_all<'a>(&'a self, values: &'a FieldValues) -> BoxedSchemaFuture<'a, E> {
        Box::pin(async move {
            let mut issues = FieldIssues::new();
            for entry in &self.fields {
                let value = values.get(entry.key).unwrap_or(&UNSET);
                issues.extend(entry.key, Self::check_entry(entry, value).await);
            }
            for rule in &self.form_rules {
                for (key, issue) in rule(values) {
                    issues.push(key, issue);
                }
            }
            SchemaOutcome::from_issues(issues)
        })
    }

    fn validate_field<'a>(
        &'a self,
        key: FieldKey,
        value: &'a FieldValue,
    ) -> BoxedSchemaFuture<'a, E> {
        Box::pin(async move {
            let mut issues = FieldIssues::new();
            if let Some(entry) = self.fields.iter().find(|entry| entry.key == key) {
                issues.extend(key, Self::check_entry(entry, value).await);
            }
            SchemaOutcome::from_issues(issues)
        })
    }
}
