use calmform::form::{
    AfterSubmitMode, FieldKey, FieldMeta, FieldValue, FormController, FormOptions, RuleSchema,
    SubmitState, TriggerAction, ValidationMode, ValuePatch, rules,
};
use futures::executor::block_on;
use rust_decimal::Decimal;

const NAME: FieldKey = FieldKey::new("name");
const AGE: FieldKey = FieldKey::new("age");

fn age_schema() -> RuleSchema {
    RuleSchema::new().rule(AGE, rules::number_between(18, 99, "age must be between 18 and 99"))
}

fn name_age_schema() -> RuleSchema {
    RuleSchema::new()
        .rule(NAME, rules::min_length(3, "name is too short"))
        .rule(AGE, rules::number_between(18, 99, "age must be between 18 and 99"))
}

#[test]
fn smart_lazy_blur_on_valid_seed_marks_field_validated() {
    let form = FormController::with_initial_values(
        age_schema(),
        ValuePatch::new().set("age", 24),
        FormOptions::default(),
    )
    .expect("seed age");

    block_on(form.on_blur_async("age")).expect("blur age");

    assert_eq!(form.error(AGE).expect("age error"), None);
    assert_eq!(
        form.field_meta(AGE).expect("age meta"),
        FieldMeta {
            touched: true,
            dirty: false,
            invalid: false,
            validated: true,
        }
    );
}

#[test]
fn smart_lazy_revalidates_on_input_while_invalid() {
    let form = FormController::new(age_schema(), FormOptions::default());

    block_on(form.on_blur_async(AGE)).expect("blur age");
    assert!(form.error(AGE).expect("age error").is_some());
    assert!(form.field_meta(AGE).expect("age meta").invalid);

    form.set_field_value(AGE, 30).expect("set age");
    let action = block_on(form.on_input_async(AGE)).expect("input age");
    assert_eq!(action, TriggerAction::Validate);
    assert_eq!(form.error(AGE).expect("age error"), None);
    assert!(!form.field_meta(AGE).expect("age meta").invalid);
}

#[test]
fn submit_then_input_clears_error_without_blur() {
    let form = FormController::with_initial_values(
        RuleSchema::new().rule(NAME, rules::min_length(3, "name is too short")),
        ValuePatch::new().set(NAME, ""),
        FormOptions {
            mode_after_submit: AfterSubmitMode::Input,
            ..FormOptions::default()
        },
    )
    .expect("seed name");

    let outcome = block_on(form.handle_submit(|_| {}, |_| {}).submit()).expect("submit");
    assert!(!outcome.is_valid());
    assert_eq!(form.submit_count().expect("submit count"), 1);
    assert_eq!(
        form.error(NAME).expect("name error").as_deref(),
        Some("name is too short")
    );
    assert!(!form.is_submitting().expect("submitting flag"));
    assert_eq!(form.submit_state().expect("submit state"), SubmitState::Failed);

    form.write_value(NAME, "Alice").expect("write name");
    block_on(form.on_input_async(NAME)).expect("input name");
    assert_eq!(form.error(NAME).expect("name error"), None);
}

#[test]
fn bulk_set_marks_every_field_dirty_and_touched() {
    let form = FormController::new(name_age_schema(), FormOptions::default());

    form.set_form_values(ValuePatch::new().set("age", 99))
        .expect("set form values");

    for key in [NAME, AGE] {
        let meta = form.field_meta(key).expect("field meta");
        assert!(meta.touched, "{key} touched");
        assert!(meta.dirty, "{key} dirty");
    }
    assert_eq!(form.value(NAME).expect("name value"), FieldValue::Unset);
    assert_eq!(
        form.value(AGE).expect("age value"),
        FieldValue::Number(Decimal::from(99))
    );
}

#[test]
fn reset_after_failed_validation_restores_seed() {
    let form = FormController::with_initial_values(
        age_schema(),
        ValuePatch::new().set(AGE, 24),
        FormOptions::default(),
    )
    .expect("seed age");

    form.write_value(AGE, FieldValue::Unset).expect("clear age");
    block_on(form.on_blur_async(AGE)).expect("blur age");
    assert!(form.field_meta(AGE).expect("age meta").invalid);

    form.reset().expect("reset");

    assert_eq!(
        form.value(AGE).expect("age value"),
        FieldValue::Number(Decimal::from(24))
    );
    assert!(form.errors().expect("errors").is_empty());
    assert_eq!(form.field_meta(AGE).expect("age meta"), FieldMeta::default());
}

#[test]
fn blur_after_submit_follows_post_submit_policy() {
    let form = FormController::new(
        name_age_schema(),
        FormOptions {
            mode: ValidationMode::Aggressive,
            mode_after_submit: AfterSubmitMode::Submit,
            ..FormOptions::default()
        },
    );

    block_on(form.handle_submit(|_| {}, |_| {}).submit()).expect("submit");
    assert!(form.is_submitted().expect("submitted flag"));

    form.write_value(NAME, "Alice").expect("write name");
    assert_eq!(form.on_input(NAME).expect("input"), TriggerAction::Skip);
    assert_eq!(form.on_blur(NAME).expect("blur"), TriggerAction::Skip);
    assert_eq!(form.pending_validations().expect("pending"), 0);
    assert!(form.error(NAME).expect("name error").is_some());
}
