use crate::traits::TableMetadata;
use crate::value::{FieldMap, QueryValue};

/// Type of update operation to perform on a field
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// Set field to a specific value: field = $N
    Set(QueryValue),

    /// Increment field by a value: field = field + $N
    Increment(QueryValue),

    /// Decrement field by a value: field = field - $N
    Decrement(QueryValue),

    /// Multiply field by a value: field = field * $N
    Multiply(QueryValue),

    /// Divide field by a value: field = field / $N
    Divide(QueryValue),
}

impl UpdateOperation {
    /// Render the assignment given the already-rendered right-hand operand
    /// (`$N` or `NULL`)
    pub fn to_sql(&self, field_name: &str, operand: &str) -> String {
        match self {
            UpdateOperation::Set(_) => format!("{} = {}", field_name, operand),
            UpdateOperation::Increment(_) => {
                format!("{} = {} + {}", field_name, field_name, operand)
            }
            UpdateOperation::Decrement(_) => {
                format!("{} = {} - {}", field_name, field_name, operand)
            }
            UpdateOperation::Multiply(_) => {
                format!("{} = {} * {}", field_name, field_name, operand)
            }
            UpdateOperation::Divide(_) => {
                format!("{} = {} / {}", field_name, field_name, operand)
            }
        }
    }

    /// Get the value to bind as a parameter
    pub fn value(&self) -> &QueryValue {
        match self {
            UpdateOperation::Set(v)
            | UpdateOperation::Increment(v)
            | UpdateOperation::Decrement(v)
            | UpdateOperation::Multiply(v)
            | UpdateOperation::Divide(v) => v,
        }
    }
}

/// Ordered container of update operations
///
/// Setting the same column twice keeps the first position and the last
/// operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    operations: Vec<(String, UpdateOperation)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: String, operation: UpdateOperation) -> Self {
        match self.operations.iter_mut().find(|(f, _)| *f == field) {
            Some(existing) => existing.1 = operation,
            None => self.operations.push((field, operation)),
        }
        self
    }

    /// Set a field to a specific value
    pub fn set(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(field.into(), UpdateOperation::Set(value.into()))
    }

    /// Increment a field by a value (atomic: field = field + value)
    pub fn increment(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(field.into(), UpdateOperation::Increment(value.into()))
    }

    /// Decrement a field by a value (atomic: field = field - value)
    pub fn decrement(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(field.into(), UpdateOperation::Decrement(value.into()))
    }

    /// Multiply a field by a value (atomic: field = field * value)
    pub fn multiply(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(field.into(), UpdateOperation::Multiply(value.into()))
    }

    /// Divide a field by a value (atomic: field = field / value)
    pub fn divide(self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(field.into(), UpdateOperation::Divide(value.into()))
    }

    pub fn operations(&self) -> impl Iterator<Item = (&str, &UpdateOperation)> {
        self.operations.iter().map(|(f, op)| (f.as_str(), op))
    }

    /// Check if there are any operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Every column of a typed record except its primary key
    pub fn from_record<T: TableMetadata>(record: &T) -> Self {
        let mut fields = record.to_field_map();
        fields.remove(T::primary_key_field());
        fields.into()
    }
}

impl From<FieldMap> for UpdateSet {
    fn from(fields: FieldMap) -> Self {
        let mut set = UpdateSet::new();
        for (column, value) in fields.iter() {
            set = set.set(column, value.clone());
        }
        set
    }
}
