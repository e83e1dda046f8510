use serde_json::Value as JsonValue;

use super::Model;

/// Records attached to a model under a relation name.
#[derive(Debug, Clone)]
pub enum Related {
    /// To-one relation.
    One(Box<Model>),
    /// To-many relation, in load order.
    Many(Vec<Model>),
}

impl Related {
    /// The related record of a to-one relation.
    #[must_use]
    pub fn one(&self) -> Option<&Model> {
        match self {
            Related::One(model) => Some(model),
            Related::Many(_) => None,
        }
    }

    /// All related records; a to-one relation yields a single-element slice.
    #[must_use]
    pub fn many(&self) -> &[Model] {
        match self {
            Related::One(model) => std::slice::from_ref(model.as_ref()),
            Related::Many(models) => models,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.many().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.many().is_empty()
    }

    pub(crate) fn to_json(&self) -> JsonValue {
        match self {
            Related::One(model) => model.to_json(),
            Related::Many(models) => JsonValue::Array(models.iter().map(Model::to_json).collect()),
        }
    }
}

impl From<Model> for Related {
    fn from(model: Model) -> Self {
        Related::One(Box::new(model))
    }
}

impl From<Vec<Model>> for Related {
    fn from(models: Vec<Model>) -> Self {
        Related::Many(models)
    }
}
