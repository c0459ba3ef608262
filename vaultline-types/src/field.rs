//! Template field specifications.
//!
//! A template is an ordered list of [`FieldSpec`]s. Entry values are
//! addressed positionally, so the order of this list is part of the
//! template's identity: reordering fields breaks every existing entry.

use serde::{Deserialize, Serialize};

/// A numeric limit, optionally exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bound<T> {
    pub value: T,
    #[serde(default)]
    pub exclusive: bool,
}

impl<T> Bound<T> {
    pub fn inclusive(value: T) -> Self {
        Self { value, exclusive: false }
    }

    pub fn exclusive(value: T) -> Self {
        Self { value, exclusive: true }
    }
}

/// Shape shared by integer and real fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericField<T> {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Bound<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Bound<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<T>,
}

impl<T> NumericField<T> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            minimum: None,
            maximum: None,
            multiple_of: None,
            default: None,
        }
    }

    pub fn with_minimum(mut self, bound: Bound<T>) -> Self {
        self.minimum = Some(bound);
        self
    }

    pub fn with_maximum(mut self, bound: Bound<T>) -> Self {
        self.maximum = Some(bound);
        self
    }

    pub fn with_multiple_of(mut self, step: T) -> Self {
        self.multiple_of = Some(step);
        self
    }

    pub fn with_default(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }
}

/// Free-form text field. Content is never inspected, only the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl TextField {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default: None,
        }
    }
}

/// One positional field of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSpec {
    Integer(NumericField<i64>),
    Real(NumericField<f64>),
    Text(TextField),
}

/// Discriminant of a [`FieldSpec`], used for typed rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Real,
    Text,
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        match self {
            Self::Integer(f) => &f.name,
            Self::Real(f) => &f.name,
            Self::Text(f) => &f.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Integer(f) => f.description.as_deref(),
            Self::Real(f) => f.description.as_deref(),
            Self::Text(f) => f.description.as_deref(),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Integer(_) => FieldKind::Integer,
            Self::Real(_) => FieldKind::Real,
            Self::Text(_) => FieldKind::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integer_field_wire_shape() {
        let spec = FieldSpec::Integer(
            NumericField::named("age")
                .with_minimum(Bound::inclusive(0))
                .with_maximum(Bound::exclusive(150))
                .with_multiple_of(1),
        );
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "integer",
                "name": "age",
                "minimum": { "value": 0, "exclusive": false },
                "maximum": { "value": 150, "exclusive": true },
                "multipleOf": 1
            })
        );
    }

    #[test]
    fn text_field_parses_without_optionals() {
        let spec: FieldSpec =
            serde_json::from_value(serde_json::json!({ "type": "text", "name": "note" })).unwrap();
        assert_eq!(spec.kind(), FieldKind::Text);
        assert_eq!(spec.name(), "note");
        assert_eq!(spec.description(), None);
    }

    #[test]
    fn bound_exclusive_defaults_to_false() {
        let bound: Bound<f64> = serde_json::from_str(r#"{"value": 1.5}"#).unwrap();
        assert!(!bound.exclusive);
    }
}
