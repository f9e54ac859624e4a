//! Module: project
//! Responsibility: mapping result tuples into named records and user types.
//! Does not own: tuple production or expression labeling.
//! Boundary: binding failures are explicit errors, never silent nulls.

use crate::{
    tuple::Tuple,
    value::{Value, ValueType},
};
use thiserror::Error as ThisError;

///
/// ProjectError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ProjectError {
    #[error("no selected expression is labeled '{field}'")]
    MissingField { field: String },

    #[error("constructor projection expects {expected} values, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("field '{field}' expects {expected}, found {found}")]
    FieldType {
        field: String,
        expected: ValueType,
        found: String,
    },
}

///
/// Record
///
/// A projected result row: field names in shape order with their values.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn require(&self, name: &str) -> Result<&Value, ProjectError> {
        self.get(name).ok_or_else(|| ProjectError::MissingField {
            field: name.to_string(),
        })
    }

    /// Typed accessor; a null or mistyped value is a `FieldType` error.
    pub fn int(&self, name: &str) -> Result<i64, ProjectError> {
        let value = self.require(name)?;
        value.as_int().ok_or_else(|| ProjectError::FieldType {
            field: name.to_string(),
            expected: ValueType::Int,
            found: value.to_string(),
        })
    }

    pub fn text(&self, name: &str) -> Result<&str, ProjectError> {
        let value = self.require(name)?;
        value.as_text().ok_or_else(|| ProjectError::FieldType {
            field: name.to_string(),
            expected: ValueType::Text,
            found: value.to_string(),
        })
    }
}

///
/// FromRecord
///
/// Conversion from a projected record into a user type, the final hop
/// of a fields or constructor projection.
///

pub trait FromRecord: Sized {
    fn from_record(record: &Record) -> Result<Self, ProjectError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Binding {
    /// Bind by projection label; every shape field must match a label.
    Fields,
    /// Bind positionally; select arity must equal shape arity.
    Constructor,
}

///
/// Projector
///
/// A declared result shape plus its binding mode. One projector maps
/// every tuple of a result set the same way.
///

#[derive(Clone, Debug)]
pub struct Projector {
    shape: Vec<String>,
    binding: Binding,
}

impl Projector {
    /// Bind by label: each shape field takes the value of the select
    /// item labeled with its name, wherever it sits in the select list.
    #[must_use]
    pub fn fields(shape: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            shape: shape.into_iter().map(Into::into).collect(),
            binding: Binding::Fields,
        }
    }

    /// Bind positionally: the nth select item fills the nth shape field.
    #[must_use]
    pub fn constructor(shape: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            shape: shape.into_iter().map(Into::into).collect(),
            binding: Binding::Constructor,
        }
    }

    pub fn project(&self, tuple: &Tuple) -> Result<Record, ProjectError> {
        let fields = match self.binding {
            Binding::Fields => self.bind_fields(tuple)?,
            Binding::Constructor => self.bind_positional(tuple)?,
        };

        Ok(Record { fields })
    }

    pub fn project_all(&self, tuples: &[Tuple]) -> Result<Vec<Record>, ProjectError> {
        tuples.iter().map(|tuple| self.project(tuple)).collect()
    }

    /// Project straight into a user type.
    pub fn project_into<T: FromRecord>(&self, tuple: &Tuple) -> Result<T, ProjectError> {
        T::from_record(&self.project(tuple)?)
    }

    fn bind_fields(&self, tuple: &Tuple) -> Result<Vec<(String, Value)>, ProjectError> {
        let mut fields = Vec::with_capacity(self.shape.len());
        for name in &self.shape {
            let value = tuple
                .items()
                .iter()
                .find(|(expr, _)| expr.label() == Some(name))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| ProjectError::MissingField {
                    field: name.clone(),
                })?;
            fields.push((name.clone(), value));
        }

        Ok(fields)
    }

    fn bind_positional(&self, tuple: &Tuple) -> Result<Vec<(String, Value)>, ProjectError> {
        if tuple.len() != self.shape.len() {
            return Err(ProjectError::ArityMismatch {
                expected: self.shape.len(),
                found: tuple.len(),
            });
        }

        Ok(self
            .shape
            .iter()
            .zip(tuple.values())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn tuple() -> Tuple {
        Tuple::new(vec![
            (
                Expr::constant("ruby").as_("username"),
                Value::Text("ruby".into()),
            ),
            (Expr::constant(28).as_("age"), Value::Int(28)),
        ])
    }

    #[test]
    fn fields_binding_matches_labels_in_any_order() {
        let projector = Projector::fields(["age", "username"]);
        let record = projector.project(&tuple()).unwrap();

        assert_eq!(record.int("age").unwrap(), 28);
        assert_eq!(record.text("username").unwrap(), "ruby");
    }

    #[test]
    fn unmatched_shape_field_is_an_explicit_error() {
        let projector = Projector::fields(["username", "height"]);
        let err = projector.project(&tuple()).unwrap_err();

        assert_eq!(
            err,
            ProjectError::MissingField {
                field: "height".into()
            }
        );
    }

    #[test]
    fn constructor_binding_is_strict_about_arity() {
        let projector = Projector::constructor(["username", "age", "height"]);
        let err = projector.project(&tuple()).unwrap_err();

        assert_eq!(
            err,
            ProjectError::ArityMismatch {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn typed_accessors_reject_mismatched_values() {
        let projector = Projector::constructor(["username", "age"]);
        let record = projector.project(&tuple()).unwrap();

        assert!(matches!(
            record.int("username"),
            Err(ProjectError::FieldType { .. })
        ));
    }
}
