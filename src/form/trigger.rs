use std::fmt::{Display, Formatter};
use std::str::FromStr;

use futures_timer::Delay;
use tracing::{debug, trace};

use super::controller::{
    FieldMeta, FormController, FormOptions, FormResult, FormState, read_lock, write_lock,
};
use super::schema::Schema;
use super::value::{AsFieldName, FieldKey};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ValidationMode {
    Aggressive,
    Touch,
    Eager,
    #[default]
    SmartLazy,
    Lazy,
    Submit,
}

impl ValidationMode {
    pub const ALL: [ValidationMode; 6] = [
        ValidationMode::Aggressive,
        ValidationMode::Touch,
        ValidationMode::Eager,
        ValidationMode::SmartLazy,
        ValidationMode::Lazy,
        ValidationMode::Submit,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ValidationMode::Aggressive => "aggressive",
            ValidationMode::Touch => "touch",
            ValidationMode::Eager => "eager",
            ValidationMode::SmartLazy => "smartLazy",
            ValidationMode::Lazy => "lazy",
            ValidationMode::Submit => "submit",
        }
    }

    pub fn transition(
        self,
        after_submit: AfterSubmitMode,
        submitted: bool,
        event: Interaction,
        meta: FieldMeta,
    ) -> Transition {
        // Post-submit policy short-circuits the pre-submit table.
        let action = if submitted {
            match (event, after_submit) {
                (Interaction::Input, AfterSubmitMode::Input)
                | (Interaction::Blur, AfterSubmitMode::Blur) => TriggerAction::Validate,
                _ => TriggerAction::Skip,
            }
        } else {
            match (event, self) {
                (Interaction::Blur, ValidationMode::Submit) => TriggerAction::Skip,
                (Interaction::Blur, _) => TriggerAction::Validate,
                (Interaction::Input, ValidationMode::Aggressive) => TriggerAction::Validate,
                (Interaction::Input, ValidationMode::Touch) if meta.touched => {
                    TriggerAction::Validate
                }
                (Interaction::Input, ValidationMode::Eager) if meta.touched || meta.validated => {
                    TriggerAction::Validate
                }
                (Interaction::Input, ValidationMode::Eager) => TriggerAction::DryRunThenValidate,
                (Interaction::Input, ValidationMode::SmartLazy) if meta.invalid => {
                    TriggerAction::Validate
                }
                (Interaction::Input, _) => TriggerAction::Skip,
            }
        };
        Transition {
            mark_dirty: event == Interaction::Input,
            mark_touched: event == Interaction::Blur,
            action,
        }
    }
}

impl Display for ValidationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseModeError(pub String);

impl Display for ParseModeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown validation mode `{}`", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for ValidationMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ValidationMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| ParseModeError(value.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum AfterSubmitMode {
    #[default]
    Input,
    Blur,
    Submit,
}

impl FromStr for AfterSubmitMode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "input" => Ok(AfterSubmitMode::Input),
            "blur" => Ok(AfterSubmitMode::Blur),
            "submit" => Ok(AfterSubmitMode::Submit),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Interaction {
    Input,
    Blur,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum TriggerAction {
    Skip,
    Validate,
    DryRunThenValidate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Transition {
    pub mark_dirty: bool,
    pub mark_touched: bool,
    pub action: TriggerAction,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum ScheduledValidation {
    Field {
        key: FieldKey,
        generation: u64,
        debounced: bool,
    },
    Probe {
        key: FieldKey,
        generation: u64,
    },
    Arm {
        key: FieldKey,
    },
    Form,
}

pub(super) fn mount_tasks(options: &FormOptions, keys: &[FieldKey]) -> Vec<ScheduledValidation> {
    if options.validate_on_mount {
        vec![ScheduledValidation::Form]
    } else if options.dry_validate_on_mount {
        keys.iter()
            .map(|key| ScheduledValidation::Arm { key: *key })
            .collect()
    } else {
        Vec::new()
    }
}

impl FormState {
    pub(super) fn enqueue(
        &mut self,
        key: FieldKey,
        task: impl FnOnce(u64) -> ScheduledValidation,
    ) -> u64 {
        let generation = self.generations.entry(key).or_default();
        *generation += 1;
        let generation = *generation;
        self.queue.push_back(task(generation));
        generation
    }

    fn is_current_generation(&self, key: FieldKey, generation: u64) -> bool {
        self.generations.get(&key).copied() == Some(generation)
    }
}

impl<S> FormController<S>
where
    S: Schema,
{
    pub fn on_input(&self, field: impl AsFieldName) -> FormResult<TriggerAction> {
        let key = self.resolve(field)?;
        self.interact(key, Interaction::Input)
    }

    pub fn on_blur(&self, field: impl AsFieldName) -> FormResult<TriggerAction> {
        let key = self.resolve(field)?;
        self.interact(key, Interaction::Blur)
    }

    pub async fn on_input_async(&self, field: impl AsFieldName) -> FormResult<TriggerAction> {
        let action = self.on_input(field)?;
        self.run_scheduled().await?;
        Ok(action)
    }

    pub async fn on_blur_async(&self, field: impl AsFieldName) -> FormResult<TriggerAction> {
        let action = self.on_blur(field)?;
        self.run_scheduled().await?;
        Ok(action)
    }

    pub fn pending_validations(&self) -> FormResult<usize> {
        Ok(read_lock(&self.state, "counting scheduled validations")?
            .queue
            .len())
    }

    /// Drains the validation queue, including tasks scheduled while draining.
    /// Returns how many tasks actually ran.
    pub async fn run_scheduled(&self) -> FormResult<usize> {
        let mut executed = 0;
        loop {
            let (next, epoch) = {
                let mut state = write_lock(&self.state, "popping scheduled validation")?;
                (state.queue.pop_front(), state.epoch)
            };
            let Some(task) = next else {
                break;
            };

            match task {
                ScheduledValidation::Field {
                    key,
                    generation,
                    debounced,
                } => {
                    if !self.is_scheduled_current(key, generation)?
                        || (debounced
                            && self.debounce().await
                            && !self.is_scheduled_current(key, generation)?)
                    {
                        trace!(field = %key, generation, "skipping superseded validation");
                        continue;
                    }
                    let _ = self.validate_key(key).await?;
                }
                ScheduledValidation::Probe { key, generation } => {
                    if !self.is_scheduled_current(key, generation)?
                        || (self.debounce().await && !self.is_scheduled_current(key, generation)?)
                    {
                        trace!(field = %key, generation, "skipping superseded probe");
                        continue;
                    }
                    if self.dry_run_key(key).await? {
                        let mut state = write_lock(&self.state, "arming probed field")?;
                        if state.is_current_generation(key, generation) {
                            state.ensure_meta(key).touched = true;
                            state.enqueue(key, |generation| ScheduledValidation::Field {
                                key,
                                generation,
                                debounced: false,
                            });
                        } else {
                            trace!(field = %key, generation, "dropping probe superseded mid-run");
                        }
                    }
                }
                ScheduledValidation::Arm { key } => {
                    if self.dry_run_key(key).await? {
                        let mut state = write_lock(&self.state, "arming field on mount")?;
                        if state.is_current_epoch(epoch) {
                            let meta = state.ensure_meta(key);
                            meta.validated = true;
                            meta.touched |= self.options.touch_on_dry_mount;
                        } else {
                            trace!(field = %key, "dropping mount dry run started before reset");
                        }
                    }
                }
                ScheduledValidation::Form => {
                    let _ = self.validate_form().await?;
                }
            }
            executed += 1;
        }
        Ok(executed)
    }

    fn interact(&self, key: FieldKey, event: Interaction) -> FormResult<TriggerAction> {
        let mut state = write_lock(&self.state, "handling field interaction")?;
        let submitted = state.submit_count > 0;
        let transition = self.options.mode.transition(
            self.options.mode_after_submit,
            submitted,
            event,
            state.meta(key),
        );

        let meta = state.ensure_meta(key);
        meta.dirty |= transition.mark_dirty;
        meta.touched |= transition.mark_touched;

        match transition.action {
            TriggerAction::Skip => {}
            TriggerAction::Validate => {
                state.enqueue(key, |generation| ScheduledValidation::Field {
                    key,
                    generation,
                    debounced: event == Interaction::Input,
                });
            }
            TriggerAction::DryRunThenValidate => {
                state.enqueue(key, |generation| ScheduledValidation::Probe { key, generation });
            }
        }
        debug!(
            field = %key,
            ?event,
            mode = %self.options.mode,
            submitted,
            action = ?transition.action,
            "field interaction"
        );
        Ok(transition.action)
    }

    fn is_scheduled_current(&self, key: FieldKey, generation: u64) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking scheduled generation")?
            .is_current_generation(key, generation))
    }

    async fn debounce(&self) -> bool {
        if self.options.input_debounce.is_zero() {
            return false;
        }
        Delay::new(self.options.input_debounce).await;
        true
    }
}
