//! Mutation builders.

use crate::types::{is_reserved_property, ActionKind, Properties};
use serde_json::{Number, Value};

/// One pending profile change, tagged by action kind.
///
/// Payloads never contain reserved property names.
#[derive(Clone, Debug, PartialEq)]
pub enum MutationRecord {
    Set(Properties),
    SetOnce(Properties),
    /// Names of the properties to remove.
    Unset(Vec<String>),
    /// Property name to numeric delta.
    Add(Properties),
    Append(Properties),
    Remove(Properties),
    /// Property name to list of values to merge.
    Union(Properties),
    Delete,
}

impl MutationRecord {
    pub fn kind(&self) -> ActionKind {
        match self {
            MutationRecord::Set(_) => ActionKind::Set,
            MutationRecord::SetOnce(_) => ActionKind::SetOnce,
            MutationRecord::Unset(_) => ActionKind::Unset,
            MutationRecord::Add(_) => ActionKind::Add,
            MutationRecord::Append(_) => ActionKind::Append,
            MutationRecord::Remove(_) => ActionKind::Remove,
            MutationRecord::Union(_) => ActionKind::Union,
            MutationRecord::Delete => ActionKind::Delete,
        }
    }

    /// Property map for every kind except `Unset` and `Delete`.
    pub fn properties(&self) -> Option<&Properties> {
        match self {
            MutationRecord::Set(props)
            | MutationRecord::SetOnce(props)
            | MutationRecord::Add(props)
            | MutationRecord::Append(props)
            | MutationRecord::Remove(props)
            | MutationRecord::Union(props) => Some(props),
            MutationRecord::Unset(_) | MutationRecord::Delete => None,
        }
    }

    /// A record with nothing to send. `Delete` is never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            MutationRecord::Unset(names) => names.is_empty(),
            MutationRecord::Delete => false,
            other => other.properties().map_or(true, |p| p.is_empty()),
        }
    }

    /// JSON value stored under the action key on the wire.
    ///
    /// `Delete` yields `Null`; the dispatch gate fills in the target.
    pub fn payload_value(&self) -> Value {
        match self {
            MutationRecord::Unset(names) => {
                Value::Array(names.iter().cloned().map(Value::String).collect())
            }
            MutationRecord::Delete => Value::Null,
            other => Value::Object(other.properties().cloned().unwrap_or_default()),
        }
    }

    /// Queue slot form: unset names become `name -> true` so slots merge uniformly.
    pub(crate) fn into_slot(self) -> Option<Properties> {
        match self {
            MutationRecord::Set(props)
            | MutationRecord::SetOnce(props)
            | MutationRecord::Add(props)
            | MutationRecord::Append(props)
            | MutationRecord::Remove(props)
            | MutationRecord::Union(props) => Some(props),
            MutationRecord::Unset(names) => Some(
                names
                    .into_iter()
                    .map(|name| (name, Value::Bool(true)))
                    .collect(),
            ),
            MutationRecord::Delete => None,
        }
    }

    /// Inverse of [`into_slot`](Self::into_slot).
    pub(crate) fn from_slot(kind: ActionKind, slot: Properties) -> Option<Self> {
        let record = match kind {
            ActionKind::Set => MutationRecord::Set(slot),
            ActionKind::SetOnce => MutationRecord::SetOnce(slot),
            ActionKind::Unset => MutationRecord::Unset(slot.into_iter().map(|(k, _)| k).collect()),
            ActionKind::Add => MutationRecord::Add(slot),
            ActionKind::Append => MutationRecord::Append(slot),
            ActionKind::Remove => MutationRecord::Remove(slot),
            ActionKind::Union => MutationRecord::Union(slot),
            ActionKind::Delete => return None,
        };
        Some(record)
    }
}

/// Arguments of a property call: a single `(name, value)` pair or a map.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyInput {
    One(String, Value),
    Many(Properties),
}

impl PropertyInput {
    /// Flatten to a map, silently dropping reserved names.
    fn into_filtered(self) -> Properties {
        let pairs: Vec<(String, Value)> = match self {
            PropertyInput::One(name, value) => vec![(name, value)],
            PropertyInput::Many(props) => props.into_iter().collect(),
        };

        pairs
            .into_iter()
            .filter(|(name, _)| {
                let reserved = is_reserved_property(name);
                if reserved {
                    tracing::debug!(property = %name, "dropping reserved property");
                }
                !reserved
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for PropertyInput {
    fn from((name, value): (K, V)) -> Self {
        PropertyInput::One(name.into(), value.into())
    }
}

impl From<Properties> for PropertyInput {
    fn from(props: Properties) -> Self {
        PropertyInput::Many(props)
    }
}

pub fn set_action(input: impl Into<PropertyInput>) -> MutationRecord {
    MutationRecord::Set(input.into().into_filtered())
}

pub fn set_once_action(input: impl Into<PropertyInput>) -> MutationRecord {
    MutationRecord::SetOnce(input.into().into_filtered())
}

/// Accepts one name or many; the payload is always a list of names.
pub fn unset_action<I, S>(names: I) -> MutationRecord
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names.into_iter().map(Into::into) {
        if is_reserved_property(&name) || out.contains(&name) {
            continue;
        }
        out.push(name);
    }
    MutationRecord::Unset(out)
}

/// Build an `$add` record. Values that cannot be read as numbers are logged
/// and omitted; the remaining keys are kept.
pub fn add_action(input: impl Into<PropertyInput>) -> MutationRecord {
    let mut add = Properties::new();
    for (name, value) in input.into().into_filtered() {
        match coerce_number(&value) {
            Some(number) => {
                add.insert(name, number);
            }
            None => {
                tracing::error!(
                    property = %name,
                    value = %value,
                    "invalid increment value, must be a number"
                );
            }
        }
    }
    MutationRecord::Add(add)
}

pub fn append_action(input: impl Into<PropertyInput>) -> MutationRecord {
    MutationRecord::Append(input.into().into_filtered())
}

pub fn remove_action(input: impl Into<PropertyInput>) -> MutationRecord {
    MutationRecord::Remove(input.into().into_filtered())
}

/// Build a `$union` record. Scalar values are wrapped in a one-item list.
pub fn union_action(input: impl Into<PropertyInput>) -> MutationRecord {
    let union = input
        .into()
        .into_filtered()
        .into_iter()
        .map(|(name, value)| match value {
            Value::Array(_) => (name, value),
            scalar => (name, Value::Array(vec![scalar])),
        })
        .collect();
    MutationRecord::Union(union)
}

pub fn delete_action() -> MutationRecord {
    MutationRecord::Delete
}

/// Read a value as a number: JSON numbers as-is, numeric strings parsed.
pub fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(int) = s.parse::<i64>() {
                return Some(Value::Number(int.into()));
            }
            s.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
        }
        _ => None,
    }
}
