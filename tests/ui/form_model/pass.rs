use calmform::form::{FieldValue, FormModel};

#[derive(Clone, Debug, PartialEq, calmform::form::FormModel)]
struct DemoForm {
    email: String,
    seats: Option<i64>,
}

fn main() {
    let fields = DemoForm::fields();
    assert_eq!(fields.email().as_str(), "email");
    assert_eq!(DemoForm::field_keys(), vec![fields.email(), fields.seats()]);

    let model = DemoForm {
        email: "a@calm.form".to_string(),
        seats: None,
    };
    let values = model.to_values();
    assert_eq!(values.get(fields.seats()), Some(&FieldValue::Unset));
    assert_eq!(DemoForm::from_values(&values), Ok(model));
}
