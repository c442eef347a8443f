use std::sync::Arc;

use tracing::{debug, warn};

use super::controller::{FormController, FormError, FormResult, FormState, SubmitState, write_lock};
use super::schema::Schema;
use super::validation::FormValidation;
use super::value::FieldValues;

type ValidSubmitFn = Arc<dyn Fn(FieldValues) + Send + Sync>;
type InvalidSubmitFn<E> = Arc<dyn Fn(&FormValidation<E>) + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome<E> {
    Valid(FieldValues),
    Invalid(FormValidation<E>),
    /// The form was reset while this submit was validating; no callback ran.
    Cancelled,
}

impl<E> SubmitOutcome<E> {
    pub fn is_valid(&self) -> bool {
        matches!(self, SubmitOutcome::Valid(_))
    }
}

pub struct SubmitHandler<S>
where
    S: Schema,
{
    controller: FormController<S>,
    on_valid: ValidSubmitFn,
    on_invalid: InvalidSubmitFn<S::Error>,
}

impl<S> Clone for SubmitHandler<S>
where
    S: Schema,
{
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            on_valid: self.on_valid.clone(),
            on_invalid: self.on_invalid.clone(),
        }
    }
}

impl<S> FormController<S>
where
    S: Schema,
{
    pub fn handle_submit<V, I>(&self, on_valid: V, on_invalid: I) -> SubmitHandler<S>
    where
        V: Fn(FieldValues) + Send + Sync + 'static,
        I: Fn(&FormValidation<S::Error>) + Send + Sync + 'static,
    {
        SubmitHandler {
            controller: self.clone(),
            on_valid: Arc::new(on_valid),
            on_invalid: Arc::new(on_invalid),
        }
    }
}

impl<S> SubmitHandler<S>
where
    S: Schema,
{
    pub async fn submit(&self) -> FormResult<SubmitOutcome<S::Error>> {
        let controller = &self.controller;
        let epoch = {
            let mut state = write_lock(&controller.state, "preparing submit")?;
            if state.submit_state.is_in_flight() {
                warn!(
                    submit_count = state.submit_count,
                    "rejecting submit while another is in flight"
                );
                return Err(FormError::AlreadySubmitting);
            }
            transition_submit_state(&mut state, SubmitState::Validating)?;
            state.submit_count = state.submit_count.saturating_add(1);
            debug!(submit_count = state.submit_count, "submit started");
            state.epoch
        };

        let validation = match controller.validate_form().await {
            Ok(validation) => validation,
            Err(error) => {
                if let Ok(mut state) = write_lock(&controller.state, "aborting submit") {
                    if state.is_current_epoch(epoch) {
                        let _ = transition_submit_state(&mut state, SubmitState::Failed);
                    }
                }
                return Err(error);
            }
        };

        let values = {
            let mut state = write_lock(&controller.state, "finishing submit validation")?;
            if !state.is_current_epoch(epoch) {
                debug!("submit cancelled by reset");
                return Ok(SubmitOutcome::Cancelled);
            }
            if validation.valid {
                transition_submit_state(&mut state, SubmitState::Submitting)?;
                Some(state.values.clone())
            } else {
                transition_submit_state(&mut state, SubmitState::Failed)?;
                None
            }
        };

        let Some(values) = values else {
            (self.on_invalid)(&validation);
            debug!(
                invalid_fields = validation.errors.len(),
                "submit rejected by validation"
            );
            return Ok(SubmitOutcome::Invalid(validation));
        };
        (self.on_valid)(values.clone());

        let mut state = write_lock(&controller.state, "completing submit")?;
        if state.is_current_epoch(epoch) {
            transition_submit_state(&mut state, SubmitState::Succeeded)?;
        }
        debug!("submit succeeded");
        Ok(SubmitOutcome::Valid(values))
    }
}

pub(super) fn transition_submit_state(state: &mut FormState, next: SubmitState) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Validating)
            | (SubmitState::Validating, SubmitState::Submitting)
            | (SubmitState::Validating, SubmitState::Failed)
            | (SubmitState::Submitting, SubmitState::Succeeded)
            | (SubmitState::Submitting, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Validating)
            | (SubmitState::Failed, SubmitState::Validating)
            | (_, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}
