use crate::error::{SchemaError, SchemaResult, SchemaViolation, ViolationReason};
use serde_json::Value;
use std::collections::HashSet;
use vaultline_types::{Bound, FieldKind, FieldSpec, NumericField};

/// Relative tolerance for real `multipleOf` checks.
const REAL_MULTIPLE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Integer {
        minimum: Option<Bound<i64>>,
        maximum: Option<Bound<i64>>,
        multiple_of: Option<i64>,
    },
    Real {
        minimum: Option<Bound<f64>>,
        maximum: Option<Bound<f64>>,
        multiple_of: Option<f64>,
    },
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct CompiledField {
    name: String,
    rule: Rule,
    default: Option<Value>,
}

/// A positional validator for one template.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    fields: Vec<CompiledField>,
}

/// Compiles a template's field list.
pub fn compile(specs: &[FieldSpec]) -> SchemaResult<CompiledSchema> {
    let mut seen = HashSet::with_capacity(specs.len());
    let mut fields = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        let name = spec.name();
        if name.trim().is_empty() {
            return Err(SchemaError::EmptyName { index });
        }
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateName {
                name: name.to_string(),
            });
        }

        let invalid = |reason: String| SchemaError::InvalidConstraint {
            index,
            field: name.to_string(),
            reason,
        };

        let (rule, default) = match spec {
            FieldSpec::Integer(f) => {
                if let Some(step) = f.multiple_of {
                    if step <= 0 {
                        return Err(invalid(format!("multipleOf must be positive, got {step}")));
                    }
                }
                check_range(f).map_err(invalid)?;
                let rule = Rule::Integer {
                    minimum: f.minimum,
                    maximum: f.maximum,
                    multiple_of: f.multiple_of,
                };
                (rule, f.default.map(Value::from))
            }
            FieldSpec::Real(f) => {
                if let Some(step) = f.multiple_of {
                    if !step.is_finite() || step <= 0.0 {
                        return Err(invalid(format!("multipleOf must be positive, got {step}")));
                    }
                }
                for bound in [f.minimum, f.maximum].into_iter().flatten() {
                    if !bound.value.is_finite() {
                        return Err(invalid("bounds must be finite".to_string()));
                    }
                }
                check_range(f).map_err(invalid)?;
                let rule = Rule::Real {
                    minimum: f.minimum,
                    maximum: f.maximum,
                    multiple_of: f.multiple_of,
                };
                let default = match f.default {
                    Some(d) => Some(
                        serde_json::Number::from_f64(d)
                            .map(Value::Number)
                            .ok_or_else(|| invalid("default must be finite".to_string()))?,
                    ),
                    None => None,
                };
                (rule, default)
            }
            FieldSpec::Text(f) => (Rule::Text, f.default.clone().map(Value::String)),
        };

        if let Some(value) = &default {
            check_value(&rule, value)
                .map_err(|reason| invalid(format!("default value rejected: {reason}")))?;
        }

        fields.push(CompiledField {
            name: name.to_string(),
            rule,
            default,
        });
    }

    tracing::trace!(fields = fields.len(), "compiled template schema");
    Ok(CompiledSchema { fields })
}

fn check_range<T: PartialOrd + Copy + std::fmt::Display>(f: &NumericField<T>) -> Result<(), String> {
    if let (Some(min), Some(max)) = (f.minimum, f.maximum) {
        let empty = if min.exclusive || max.exclusive {
            min.value >= max.value
        } else {
            min.value > max.value
        };
        if empty {
            return Err(format!("range {}..{} admits no value", min.value, max.value));
        }
    }
    Ok(())
}

fn check_bounds<T: PartialOrd>(
    value: T,
    minimum: Option<Bound<T>>,
    maximum: Option<Bound<T>>,
) -> Result<(), ViolationReason> {
    if let Some(min) = minimum {
        let below = if min.exclusive {
            value <= min.value
        } else {
            value < min.value
        };
        if below {
            return Err(ViolationReason::BelowMinimum);
        }
    }
    if let Some(max) = maximum {
        let above = if max.exclusive {
            value >= max.value
        } else {
            value > max.value
        };
        if above {
            return Err(ViolationReason::AboveMaximum);
        }
    }
    Ok(())
}

fn is_real_multiple(value: f64, step: f64) -> bool {
    let quotient = value / step;
    (quotient - quotient.round()).abs() <= REAL_MULTIPLE_EPSILON * quotient.abs().max(1.0)
}

/// Integral JSON numbers, including floats such as `5.0`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let f = value.as_f64()?;
    // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound.
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

fn check_value(rule: &Rule, value: &Value) -> Result<(), ViolationReason> {
    match rule {
        Rule::Integer {
            minimum,
            maximum,
            multiple_of,
        } => {
            let v = as_integer(value).ok_or(ViolationReason::WrongType(FieldKind::Integer))?;
            check_bounds(v, *minimum, *maximum)?;
            if let Some(step) = multiple_of {
                if v.rem_euclid(*step) != 0 {
                    return Err(ViolationReason::NotMultiple(step.to_string()));
                }
            }
            Ok(())
        }
        Rule::Real {
            minimum,
            maximum,
            multiple_of,
        } => {
            let v = value
                .as_f64()
                .ok_or(ViolationReason::WrongType(FieldKind::Real))?;
            check_bounds(v, *minimum, *maximum)?;
            if let Some(step) = multiple_of {
                if !is_real_multiple(v, *step) {
                    return Err(ViolationReason::NotMultiple(step.to_string()));
                }
            }
            Ok(())
        }
        Rule::Text => {
            if value.is_string() {
                Ok(())
            } else {
                Err(ViolationReason::WrongType(FieldKind::Text))
            }
        }
    }
}

impl CompiledSchema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn field_kinds(&self) -> Vec<FieldKind> {
        self.fields
            .iter()
            .map(|f| match f.rule {
                Rule::Integer { .. } => FieldKind::Integer,
                Rule::Real { .. } => FieldKind::Real,
                Rule::Text => FieldKind::Text,
            })
            .collect()
    }

    pub fn defaults(&self) -> Vec<Option<Value>> {
        self.fields.iter().map(|f| f.default.clone()).collect()
    }

    /// Replaces `null` values with the field default, where one exists.
    pub fn apply_defaults(&self, mut values: Vec<Value>) -> Vec<Value> {
        for (value, field) in values.iter_mut().zip(&self.fields) {
            if value.is_null() {
                if let Some(default) = &field.default {
                    *value = default.clone();
                }
            }
        }
        values
    }

    /// Checks `values` positionally and reports the first violation.
    ///
    /// An arity mismatch is reported at the first index that has no
    /// counterpart.
    pub fn validate(&self, values: &[Value]) -> Result<(), SchemaViolation> {
        for (index, (field, value)) in self.fields.iter().zip(values).enumerate() {
            check_value(&field.rule, value).map_err(|reason| SchemaViolation {
                index,
                field: field.name.clone(),
                reason,
            })?;
        }

        if values.len() < self.fields.len() {
            let index = values.len();
            return Err(SchemaViolation {
                index,
                field: self.fields[index].name.clone(),
                reason: ViolationReason::Missing,
            });
        }
        if values.len() > self.fields.len() {
            return Err(SchemaViolation {
                index: self.fields.len(),
                field: String::new(),
                reason: ViolationReason::Unexpected,
            });
        }
        Ok(())
    }
}
