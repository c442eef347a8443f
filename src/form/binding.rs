use super::controller::{FieldMeta, FormController, FormResult, read_lock};
use super::schema::Schema;
use super::trigger::TriggerAction;
use super::value::{AsFieldName, FieldKey, FieldValue, FromFieldValue, IntoFieldValue};

pub struct FieldHandle<S>
where
    S: Schema,
{
    controller: FormController<S>,
    key: FieldKey,
}

impl<S> Clone for FieldHandle<S>
where
    S: Schema,
{
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            key: self.key,
        }
    }
}

impl<S> FieldHandle<S>
where
    S: Schema,
{
    pub fn key(&self) -> FieldKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.as_str()
    }

    pub fn value(&self) -> FormResult<FieldValue> {
        self.controller.value(self.key)
    }

    pub fn value_as<T: FromFieldValue>(&self) -> FormResult<T> {
        let state = read_lock(&self.controller.state, "reading typed field value")?;
        T::from_field_value(self.key, state.values.get(self.key))
    }

    pub fn error(&self) -> FormResult<Option<String>> {
        self.controller.error(self.key)
    }

    pub fn meta(&self) -> FormResult<FieldMeta> {
        self.controller.field_meta(self.key)
    }

    pub fn set_value(&self, value: impl IntoFieldValue) -> FormResult<()> {
        self.controller.write_value(self.key, value)
    }

    pub fn input(&self, value: impl IntoFieldValue) -> FormResult<TriggerAction> {
        self.controller.write_value(self.key, value)?;
        self.controller.on_input(self.key)
    }

    pub fn blur(&self) -> FormResult<TriggerAction> {
        self.controller.on_blur(self.key)
    }
}

impl<S> FormController<S>
where
    S: Schema,
{
    pub fn fields(&self) -> Vec<FieldHandle<S>> {
        self.keys
            .iter()
            .map(|key| FieldHandle {
                controller: self.clone(),
                key: *key,
            })
            .collect()
    }

    pub fn field(&self, field: impl AsFieldName) -> FormResult<FieldHandle<S>> {
        Ok(FieldHandle {
            controller: self.clone(),
            key: self.resolve(field)?,
        })
    }
}
