use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::controller::{FormController, FormError, FormResult, read_lock, write_lock};
use super::errors::ErrorMap;
use super::schema::{Schema, SchemaOutcome, ValidationError};
use super::value::{AsFieldName, FieldKey};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldValidation<E> {
    pub valid: bool,
    pub error: Option<String>,
    pub errors: Vec<E>,
    /// False when a newer validation or a reset superseded this one; the
    /// error map and field metadata were left untouched.
    pub applied: bool,
}

impl<E> FieldValidation<E>
where
    E: ValidationError,
{
    fn from_errors(errors: Vec<E>) -> Self {
        Self {
            valid: errors.is_empty(),
            error: errors.first().map(ValidationError::message),
            errors,
            applied: true,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldResult<E> {
    pub valid: bool,
    pub errors: Vec<E>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormValidation<E> {
    pub valid: bool,
    pub errors: ErrorMap,
    pub results: BTreeMap<FieldKey, FieldResult<E>>,
}

impl<E> FormValidation<E> {
    pub fn result(&self, field: impl AsFieldName) -> Option<&FieldResult<E>> {
        self.results.get(field.field_name())
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.results
            .iter()
            .filter_map(|(key, result)| (!result.valid).then_some(*key))
    }
}

impl<S> FormController<S>
where
    S: Schema,
{
    pub async fn validate_field(
        &self,
        field: impl AsFieldName,
    ) -> FormResult<FieldValidation<S::Error>> {
        let key = self.resolve(field)?;
        self.validate_key(key).await
    }

    pub async fn validate_field_dry_run(&self, field: impl AsFieldName) -> FormResult<bool> {
        let key = self.resolve(field)?;
        self.dry_run_key(key).await
    }

    pub async fn validate_form(&self) -> FormResult<FormValidation<S::Error>> {
        let (values, tickets, epoch) = {
            let mut state = write_lock(&self.state, "starting form validation")?;
            let tickets = self
                .keys
                .iter()
                .map(|key| (*key, state.next_ticket(*key)))
                .collect::<Vec<_>>();
            (state.values.clone(), tickets, state.epoch)
        };

        let outcome = self.schema.validate_all(&values).await;
        if let SchemaOutcome::Failure(issues) = &outcome {
            if let Some((unknown, _)) = issues.iter().find(|(key, _)| !self.keys.contains(key)) {
                return Err(FormError::UnknownField(unknown.to_string()));
            }
        }

        let results = self
            .keys
            .iter()
            .map(|key| {
                let errors = outcome.issues_for(*key).to_vec();
                (
                    *key,
                    FieldResult {
                        valid: errors.is_empty(),
                        errors,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        let errors = results
            .iter()
            .filter_map(|(key, result)| {
                result
                    .errors
                    .first()
                    .map(|error| (*key, ValidationError::message(error)))
            })
            .collect::<ErrorMap>();
        let valid = results.values().all(|result| result.valid);

        {
            let mut state = write_lock(&self.state, "applying form validation result")?;
            if !state.is_current_epoch(epoch) {
                trace!("discarding form validation started before reset");
                return Ok(FormValidation {
                    valid,
                    errors,
                    results,
                });
            }
            let mut next = ErrorMap::new();
            for (key, ticket) in tickets {
                let latest = state.is_latest_ticket(key, ticket);
                let meta = state.ensure_meta(key);
                meta.touched = true;
                meta.validated = true;
                if latest {
                    meta.invalid = results.get(&key).is_some_and(|result| !result.valid);
                    next.set_field(key, errors.get(key).map(str::to_string));
                } else {
                    trace!(field = %key, "keeping newer field result over form validation");
                    next.set_field(key, state.errors.get(key).map(str::to_string));
                }
            }
            state.errors.replace_all(next);
        }
        debug!(valid, invalid_fields = errors.len(), "form validated");

        Ok(FormValidation {
            valid,
            errors,
            results,
        })
    }

    pub(super) async fn validate_key(
        &self,
        key: FieldKey,
    ) -> FormResult<FieldValidation<S::Error>> {
        let (ticket, epoch, value) = {
            let mut state = write_lock(&self.state, "starting field validation")?;
            let ticket = state.next_ticket(key);
            (
                ticket,
                state.epoch,
                state.values.get(key).cloned().unwrap_or_default(),
            )
        };

        let outcome = self.schema.validate_field(key, &value).await;
        let mut validation = FieldValidation::from_errors(match outcome {
            SchemaOutcome::Success => Vec::new(),
            SchemaOutcome::Failure(issues) => issues
                .iter()
                .flat_map(|(_, issues)| issues.iter().cloned())
                .collect(),
        });

        let mut state = write_lock(&self.state, "writing field validation result")?;
        if !state.is_current_epoch(epoch) || !state.is_latest_ticket(key, ticket) {
            trace!(field = %key, ticket = ticket.0, "discarding superseded field validation");
            validation.applied = false;
            return Ok(validation);
        }
        state.errors.set_field(key, validation.error.clone());
        let meta = state.ensure_meta(key);
        meta.invalid = !validation.valid;
        meta.validated = true;
        debug!(field = %key, valid = validation.valid, "field validated");
        Ok(validation)
    }

    pub(super) async fn dry_run_key(&self, key: FieldKey) -> FormResult<bool> {
        let value = read_lock(&self.state, "reading value for dry run")?
            .values
            .get(key)
            .cloned()
            .unwrap_or_default();
        let passed = self.schema.validate_field(key, &value).await.is_success();
        trace!(field = %key, passed, "dry run");
        Ok(passed)
    }
}
