pub use crate::form::rules;
pub use crate::form::{
    AfterSubmitMode, ErrorMap, FieldHandle, FieldKey, FieldMeta, FieldValue, FieldValues,
    FormController, FormError, FormMeta, FormModel, FormOptions, FormResult, RuleSchema,
    RuleViolation, Schema, SubmitOutcome, TriggerAction, ValidationError, ValidationMode,
    ValuePatch,
};
