//! Document representation and query filters shared by every store adapter.

use serde_json::{Map, Value};

/// A stored document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals the value
    Eq,
    /// Field differs from the value
    NotEq,
    /// Field equals one of the values of an array
    In,
    /// Field is an array containing the value
    ArrayContains,
}

/// One `(field, operator, value)` condition. A query ANDs its filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::NotEq, value)
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(field, FilterOp::In, Value::Array(values))
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::ArrayContains, value)
    }

    /// Evaluate the filter against a document held in memory.
    ///
    /// A missing field reads as `null`.
    pub fn matches(&self, document: &Document) -> bool {
        let field = document.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => field == &self.value,
            FilterOp::NotEq => field != &self.value,
            FilterOp::In => match &self.value {
                Value::Array(candidates) => candidates.contains(field),
                _ => false,
            },
            FilterOp::ArrayContains => match field {
                Value::Array(elements) => elements.contains(&self.value),
                _ => false,
            },
        }
    }
}

/// Whether a document satisfies every filter.
pub fn matches_all(filters: &[Filter], document: &Document) -> bool {
    filters.iter().all(|filter| filter.matches(document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test documents are objects"),
        }
    }

    #[test]
    fn eq_and_not_eq() {
        let item = doc(json!({"label_id": "l1", "current_quantity": 3.0}));
        assert!(Filter::eq("label_id", "l1").matches(&item));
        assert!(!Filter::eq("label_id", "l2").matches(&item));
        assert!(Filter::not_eq("label_id", "l2").matches(&item));
    }

    #[test]
    fn missing_field_reads_as_null() {
        let member = doc(json!({"nickname": "ana"}));
        assert!(Filter::eq("owner_user_id", Value::Null).matches(&member));
    }

    #[test]
    fn membership_and_array_contains() {
        let order = doc(json!({"id": "o1", "item_ids": ["a", "b"]}));
        assert!(Filter::is_in("id", ["o1", "o2"]).matches(&order));
        assert!(!Filter::is_in("id", ["o3"]).matches(&order));
        assert!(Filter::array_contains("item_ids", "b").matches(&order));
        assert!(!Filter::array_contains("item_ids", "c").matches(&order));
        assert!(!Filter::array_contains("id", "o1").matches(&order));
    }

    #[test]
    fn filters_are_conjunctive() {
        let member = doc(json!({"stash_id": "s1", "is_active": true}));
        let filters = [
            Filter::eq("stash_id", "s1"),
            Filter::eq("is_active", false),
        ];
        assert!(!matches_all(&filters, &member));
        assert!(matches_all(&[], &member));
    }
}
