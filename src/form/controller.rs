use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::debug;

use super::errors::ErrorMap;
use super::schema::Schema;
use super::trigger::{AfterSubmitMode, ScheduledValidation, ValidationMode, mount_tasks};
use super::value::{
    AsFieldName, FieldKey, FieldValue, FieldValues, FormModel, IntoFieldValue, ValuePatch,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubmitState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmitState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmitState::Validating | SubmitState::Submitting)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct FormOptions {
    pub mode: ValidationMode,
    pub mode_after_submit: AfterSubmitMode,
    pub validate_on_mount: bool,
    pub dry_validate_on_mount: bool,
    pub touch_on_dry_mount: bool,
    pub input_debounce: Duration,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::SmartLazy,
            mode_after_submit: AfterSubmitMode::Input,
            validate_on_mount: false,
            dry_validate_on_mount: false,
            touch_on_dry_mount: false,
            input_debounce: Duration::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldMeta {
    pub touched: bool,
    pub dirty: bool,
    pub invalid: bool,
    pub validated: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormMeta {
    pub touched: bool,
    pub dirty: bool,
    pub invalid: bool,
    pub validated: bool,
    pub any_validated: bool,
}

impl FormMeta {
    pub fn derive<'a>(fields: impl IntoIterator<Item = &'a FieldMeta>) -> Self {
        fields.into_iter().fold(
            FormMeta {
                validated: true,
                ..FormMeta::default()
            },
            |form, field| FormMeta {
                touched: form.touched || field.touched,
                dirty: form.dirty || field.dirty,
                invalid: form.invalid || field.invalid,
                validated: form.validated && field.validated,
                any_validated: form.any_validated || field.validated,
            },
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormSnapshot {
    pub values: FieldValues,
    pub errors: ErrorMap,
    pub field_meta: BTreeMap<FieldKey, FieldMeta>,
    pub meta: FormMeta,
    pub submit_state: SubmitState,
    pub submit_count: u32,
}

impl FormSnapshot {
    pub fn is_submitted(&self) -> bool {
        self.submit_count > 0
    }

    pub fn is_submitting(&self) -> bool {
        self.submit_state.is_in_flight()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    UnknownField(String),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    AlreadySubmitting,
    ValueMismatch {
        field: FieldKey,
        expected: &'static str,
    },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::UnknownField(name) => write!(f, "field `{name}` is not part of the schema"),
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::ValueMismatch { field, expected } => {
                write!(f, "field `{field}` does not hold a {expected} value")
            }
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) struct FormState {
    pub(super) initial_values: FieldValues,
    pub(super) values: FieldValues,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta>,
    pub(super) errors: ErrorMap,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
    pub(super) queue: VecDeque<ScheduledValidation>,
    pub(super) generations: BTreeMap<FieldKey, u64>,
    pub(super) epoch: u64,
}

impl FormState {
    pub(super) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta {
        self.field_meta.entry(key).or_default()
    }

    pub(super) fn meta(&self, key: FieldKey) -> FieldMeta {
        self.field_meta.get(&key).copied().unwrap_or_default()
    }

    pub(super) fn next_ticket(&mut self, key: FieldKey) -> ValidationTicket {
        let next = ValidationTicket(
            self.tickets
                .get(&key)
                .copied()
                .unwrap_or(ValidationTicket(0))
                .0
                + 1,
        );
        self.tickets.insert(key, next);
        next
    }

    pub(super) fn is_latest_ticket(&self, key: FieldKey, ticket: ValidationTicket) -> bool {
        self.tickets.get(&key).copied() == Some(ticket)
    }

    pub(super) fn is_current_epoch(&self, epoch: u64) -> bool {
        self.epoch == epoch
    }

    pub(super) fn write_value(&mut self, key: FieldKey, value: FieldValue) {
        match self.values.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(key, value);
            }
        }
    }

    fn mark_dirty_touched(&mut self, key: FieldKey) {
        let meta = self.ensure_meta(key);
        meta.dirty = true;
        meta.touched = true;
    }
}

pub struct FormController<S>
where
    S: Schema,
{
    pub(super) options: FormOptions,
    pub(super) schema: Arc<S>,
    pub(super) keys: Arc<[FieldKey]>,
    pub(super) state: Arc<RwLock<FormState>>,
}

impl<S> Clone for FormController<S>
where
    S: Schema,
{
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            schema: self.schema.clone(),
            keys: self.keys.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S> FormController<S>
where
    S: Schema,
{
    pub fn new(schema: S, options: FormOptions) -> Self {
        let keys: Arc<[FieldKey]> = schema.field_keys().into();
        let initial = keys
            .iter()
            .map(|key| (*key, schema.default_value(*key)))
            .collect::<FieldValues>();
        let field_meta = keys
            .iter()
            .map(|key| (*key, FieldMeta::default()))
            .collect();
        let queue = mount_tasks(&options, &keys).into_iter().collect();
        Self {
            options,
            schema: Arc::new(schema),
            keys,
            state: Arc::new(RwLock::new(FormState {
                initial_values: initial.clone(),
                values: initial,
                field_meta,
                errors: ErrorMap::new(),
                submit_state: SubmitState::Idle,
                submit_count: 0,
                tickets: BTreeMap::new(),
                queue,
                generations: BTreeMap::new(),
                epoch: 0,
            })),
        }
    }

    pub fn with_initial_values(
        schema: S,
        initial: ValuePatch,
        options: FormOptions,
    ) -> FormResult<Self> {
        let controller = Self::new(schema, options);
        let resolved = controller.resolve_patch(&initial)?;
        {
            let mut state = write_lock(&controller.state, "seeding initial values")?;
            for (key, value) in resolved {
                state.write_value(key, value.clone());
                state.initial_values.insert(key, value);
            }
        }
        Ok(controller)
    }

    pub fn with_model<M>(schema: S, model: &M, options: FormOptions) -> FormResult<Self>
    where
        M: FormModel,
    {
        Self::with_initial_values(schema, ValuePatch::from(&model.to_values()), options)
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn field_keys(&self) -> &[FieldKey] {
        &self.keys
    }

    pub fn resolve(&self, field: impl AsFieldName) -> FormResult<FieldKey> {
        let name = field.field_name();
        self.keys
            .iter()
            .copied()
            .find(|key| key.as_str() == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    fn resolve_patch(&self, patch: &ValuePatch) -> FormResult<Vec<(FieldKey, FieldValue)>> {
        patch
            .iter()
            .map(|(name, value)| Ok((self.resolve(name)?, value.clone())))
            .collect()
    }

    pub fn values(&self) -> FormResult<FieldValues> {
        Ok(read_lock(&self.state, "reading values")?.values.clone())
    }

    pub fn value(&self, field: impl AsFieldName) -> FormResult<FieldValue> {
        let key = self.resolve(field)?;
        Ok(read_lock(&self.state, "reading field value")?
            .values
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    pub fn errors(&self) -> FormResult<ErrorMap> {
        Ok(read_lock(&self.state, "reading errors")?.errors.clone())
    }

    pub fn error(&self, field: impl AsFieldName) -> FormResult<Option<String>> {
        let key = self.resolve(field)?;
        Ok(read_lock(&self.state, "reading field error")?
            .errors
            .get(key)
            .map(str::to_string))
    }

    pub fn field_meta(&self, field: impl AsFieldName) -> FormResult<FieldMeta> {
        let key = self.resolve(field)?;
        Ok(read_lock(&self.state, "reading field meta")?.meta(key))
    }

    pub fn fields_meta(&self) -> FormResult<BTreeMap<FieldKey, FieldMeta>> {
        Ok(read_lock(&self.state, "reading fields meta")?
            .field_meta
            .clone())
    }

    pub fn meta(&self) -> FormResult<FormMeta> {
        Ok(FormMeta::derive(
            read_lock(&self.state, "deriving form meta")?
                .field_meta
                .values(),
        ))
    }

    pub fn submit_count(&self) -> FormResult<u32> {
        Ok(read_lock(&self.state, "reading submit count")?.submit_count)
    }

    pub fn is_submitted(&self) -> FormResult<bool> {
        Ok(self.submit_count()? > 0)
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    pub fn is_submitting(&self) -> FormResult<bool> {
        Ok(self.submit_state()?.is_in_flight())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values: state.values.clone(),
            errors: state.errors.clone(),
            field_meta: state.field_meta.clone(),
            meta: FormMeta::derive(state.field_meta.values()),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
        })
    }

    // Input bindings write through here; metadata is left alone.
    pub fn write_value(
        &self,
        field: impl AsFieldName,
        value: impl IntoFieldValue,
    ) -> FormResult<()> {
        let key = self.resolve(field)?;
        write_lock(&self.state, "writing bound value")?
            .write_value(key, value.into_field_value());
        Ok(())
    }

    pub fn set_field_value(
        &self,
        field: impl AsFieldName,
        value: impl IntoFieldValue,
    ) -> FormResult<()> {
        let key = self.resolve(field)?;
        let mut state = write_lock(&self.state, "setting field value")?;
        state.write_value(key, value.into_field_value());
        state.mark_dirty_touched(key);
        debug!(field = %key, "field value set");
        Ok(())
    }

    /// Applies every supplied value, then marks every schema field dirty and
    /// touched, including fields absent from the patch.
    pub fn set_form_values(&self, patch: ValuePatch) -> FormResult<()> {
        let resolved = self.resolve_patch(&patch)?;
        let mut state = write_lock(&self.state, "setting form values")?;
        for (key, value) in resolved {
            state.write_value(key, value);
        }
        for key in self.keys.iter().copied() {
            state.mark_dirty_touched(key);
        }
        debug!(fields = self.keys.len(), "form values set");
        Ok(())
    }

    pub fn set_field_error(
        &self,
        field: impl AsFieldName,
        message: impl Into<String>,
    ) -> FormResult<()> {
        let key = self.resolve(field)?;
        let mut state = write_lock(&self.state, "setting field error")?;
        let meta = state.ensure_meta(key);
        meta.invalid = true;
        meta.validated = true;
        state.errors.set_field(key, Some(message.into()));
        Ok(())
    }

    pub fn clear_field_error(&self, field: impl AsFieldName) -> FormResult<()> {
        let key = self.resolve(field)?;
        write_lock(&self.state, "clearing field error")?
            .errors
            .set_field(key, None);
        Ok(())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        write_lock(&self.state, "clearing all field errors")?
            .errors
            .clear();
        Ok(())
    }

    pub fn reset(&self) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "resetting form")?;
            state.values = state.initial_values.clone();
            state.errors.clear();
            state.submit_state = SubmitState::Idle;
            state.submit_count = 0;
            state.queue.clear();
            // In-flight work started before the reset must never look current.
            state.epoch += 1;
            for key in self.keys.iter().copied() {
                let _ = state.next_ticket(key);
            }
            for generation in state.generations.values_mut() {
                *generation += 1;
            }
            for meta in state.field_meta.values_mut() {
                *meta = FieldMeta::default();
            }
        }
        debug!("form reset");
        Ok(())
    }
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
