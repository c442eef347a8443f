mod binding;
mod controller;
mod errors;
pub mod rules;
mod schema;
mod submit;
mod trigger;
mod validation;
mod value;


pub use binding::FieldHandle;
pub use calmform_derive::FormModel;
pub use controller::{
    FieldMeta, FormController, FormError, FormMeta, FormOptions, FormResult, FormSnapshot,
    SubmitState, ValidationTicket,
};
pub use errors::ErrorMap;
pub use rules::RuleViolation;
pub use schema::{
    AsyncFieldRule, BoxedSchemaFuture, BoxedValidationFuture, FieldIssues, FieldRule, FormRule,
    RuleSchema, Schema, SchemaOutcome, ValidationError,
};
pub use submit::{SubmitHandler, SubmitOutcome};
pub use trigger::{
    AfterSubmitMode, Interaction, ParseModeError, Transition, TriggerAction, ValidationMode,
};
pub use validation::{FieldResult, FieldValidation, FormValidation};
pub use value::{
    AsFieldName, FieldKey, FieldValue, FieldValues, FormModel, FromFieldValue, IntoFieldValue,
    ValuePatch,
};
