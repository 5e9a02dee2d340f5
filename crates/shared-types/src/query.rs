//! # Query Criteria and Label Changes
//!
//! Criteria select objects by top-level field or by label. Field values are
//! read from the object's JSON view; comparisons treat RFC 3339 timestamps as
//! instants and numbers numerically, falling back to string order.

use crate::errors::StorageError;
use crate::object::Object;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Generic attribute map attached to every resource.
pub type Labels = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelOperation {
    /// Add a label, merging values into an existing key.
    Add,
    /// Add values to a label.
    AddValues,
    /// Remove a label entirely.
    Remove,
    /// Remove values from a label; the key disappears once empty.
    RemoveValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelChange {
    pub operation: LabelOperation,
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl LabelChange {
    pub fn add(key: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            operation: LabelOperation::Add,
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            operation: LabelOperation::Remove,
            key: key.into(),
            values: Vec::new(),
        }
    }

    pub fn remove_values(
        key: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            operation: LabelOperation::RemoveValues,
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// Apply `changes` to `labels` in order.
pub fn apply_label_changes(labels: &mut Labels, changes: &[LabelChange]) {
    for change in changes {
        match change.operation {
            LabelOperation::Add | LabelOperation::AddValues => {
                let values = labels.entry(change.key.clone()).or_default();
                for value in &change.values {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
            }
            LabelOperation::Remove => {
                labels.remove(&change.key);
            }
            LabelOperation::RemoveValues => {
                let emptied = match labels.get_mut(&change.key) {
                    Some(values) => {
                        values.retain(|value| !change.values.contains(value));
                        values.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    labels.remove(&change.key);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionType {
    Field,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Operator {
    fn is_negative(self) -> bool {
        matches!(self, Operator::NotEquals | Operator::NotIn)
    }
}

/// A single selection predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub left_op: String,
    pub operator: Operator,
    pub right_op: Vec<String>,
    pub criterion_type: CriterionType,
}

impl Criterion {
    pub fn by_field(
        operator: Operator,
        left_op: impl Into<String>,
        right_op: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            left_op: left_op.into(),
            operator,
            right_op: right_op.into_iter().map(Into::into).collect(),
            criterion_type: CriterionType::Field,
        }
    }

    pub fn by_label(
        operator: Operator,
        key: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            left_op: key.into(),
            operator,
            right_op: values.into_iter().map(Into::into).collect(),
            criterion_type: CriterionType::Label,
        }
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::by_field(Operator::Equals, "id", [id.into()])
    }

    /// Evaluate against `object`.
    pub fn matches(&self, object: &dyn Object) -> Result<bool, StorageError> {
        let candidates = match self.criterion_type {
            CriterionType::Field => {
                let value = object.to_value()?;
                value.get(&self.left_op).and_then(scalar).into_iter().collect()
            }
            CriterionType::Label => object
                .labels()
                .get(&self.left_op)
                .cloned()
                .unwrap_or_default(),
        };

        // Negative operators hold when no candidate hits, including a missing
        // field or label.
        if self.operator.is_negative() {
            return Ok(!candidates.iter().any(|candidate| self.hits_any(candidate)));
        }
        Ok(candidates
            .iter()
            .any(|candidate| self.matches_value(candidate)))
    }

    fn hits_any(&self, candidate: &str) -> bool {
        self.right_op
            .iter()
            .any(|right| compare(candidate, right) == Ordering::Equal)
    }

    fn matches_value(&self, candidate: &str) -> bool {
        let Some(first) = self.right_op.first() else {
            return false;
        };
        match self.operator {
            Operator::Equals | Operator::In => self.hits_any(candidate),
            Operator::NotEquals | Operator::NotIn => !self.hits_any(candidate),
            // Range operators compare against the first operand only.
            Operator::LessThan => compare(candidate, first) == Ordering::Less,
            Operator::LessThanOrEqual => compare(candidate, first) != Ordering::Greater,
            Operator::GreaterThan => compare(candidate, first) == Ordering::Greater,
            Operator::GreaterThanOrEqual => compare(candidate, first) != Ordering::Less,
        }
    }
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn compare(left: &str, right: &str) -> Ordering {
    if let (Ok(l), Ok(r)) = (
        DateTime::parse_from_rfc3339(left),
        DateTime::parse_from_rfc3339(right),
    ) {
        return l.cmp(&r);
    }
    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return l.partial_cmp(&r).unwrap_or(Ordering::Equal);
    }
    left.cmp(right)
}
