//! Snapshots, patches, and the deep merge that turns one into the next.
//!
//! A record's state is a [`Snapshot`]: an immutable, reference-counted JSON
//! object. Updates are expressed as a [`Patch`], which is merged key by key
//! into a structural copy of the previous snapshot.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Maximum nesting depth a merge will descend before giving up.
pub const MAX_MERGE_DEPTH: usize = 128;

/// Immutable view of a record's data at one version.
pub type Snapshot = Rc<Map<String, Value>>;

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// One entry of a [`Patch`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    /// Overwrite the key. Object values are deep-merged into an existing
    /// object under the same key.
    Set(Value),
    /// Deep-merge a nested patch into the object under the key, creating it
    /// if absent. Nested patches may carry delete markers.
    Merge(Patch),
    /// Delete marker: remove the key.
    Delete,
}

/// A keyed update applied by [`Record::set`](crate::data::Record::set).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    entries: BTreeMap<String, PatchValue>,
}

impl Patch {
    /// An empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a JSON object into a patch of `Set` entries.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(fields.into_iter().collect()),
            other => Err(Error::NotAnObject {
                found: kind(&other),
            }),
        }
    }

    /// Set `key` to `value` (builder).
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), PatchValue::Set(value.into()));
        self
    }

    /// Mark `key` for deletion (builder).
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), PatchValue::Delete);
        self
    }

    /// Merge a nested patch under `key` (builder).
    pub fn merge(mut self, key: impl Into<String>, nested: Patch) -> Self {
        self.entries.insert(key.into(), PatchValue::Merge(nested));
        self
    }

    /// Insert an entry in place.
    pub fn insert(&mut self, key: impl Into<String>, value: PatchValue) {
        self.entries.insert(key.into(), value);
    }

    /// The entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&PatchValue> {
        self.entries.get(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PatchValue)> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the patch has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Patch {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key, PatchValue::Set(value)))
                .collect(),
        }
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(fields: Map<String, Value>) -> Self {
        fields.into_iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Merge `patch` into a copy of `base`.
///
/// Keys absent from the patch are carried over unchanged. Fails with
/// [`Error::MergeTooDeep`] past [`MAX_MERGE_DEPTH`] levels, in which case
/// nothing is produced.
pub fn merge(base: &Map<String, Value>, patch: &Patch) -> Result<Map<String, Value>> {
    merge_patch(base, patch, 0)
}

fn merge_patch(
    base: &Map<String, Value>,
    patch: &Patch,
    depth: usize,
) -> Result<Map<String, Value>> {
    check_depth(depth)?;
    let mut out = base.clone();
    for (key, change) in patch.iter() {
        match change {
            PatchValue::Delete => {
                out.remove(key);
            }
            PatchValue::Set(Value::Object(fields)) => {
                let merged = match out.get(key) {
                    Some(Value::Object(existing)) => merge_object(existing, fields, depth + 1)?,
                    _ => fields.clone(),
                };
                out.insert(key.clone(), Value::Object(merged));
            }
            PatchValue::Set(value) => {
                out.insert(key.clone(), value.clone());
            }
            PatchValue::Merge(nested) => {
                let merged = match out.get(key) {
                    Some(Value::Object(existing)) => merge_patch(existing, nested, depth + 1)?,
                    _ => merge_patch(&Map::new(), nested, depth + 1)?,
                };
                out.insert(key.clone(), Value::Object(merged));
            }
        }
    }
    Ok(out)
}

fn merge_object(
    base: &Map<String, Value>,
    fields: &Map<String, Value>,
    depth: usize,
) -> Result<Map<String, Value>> {
    check_depth(depth)?;
    let mut out = base.clone();
    for (key, value) in fields {
        let merged = match (out.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                Value::Object(merge_object(existing, nested, depth + 1)?)
            }
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    Ok(out)
}

fn check_depth(depth: usize) -> Result<()> {
    if depth >= MAX_MERGE_DEPTH {
        return Err(Error::MergeTooDeep {
            limit: MAX_MERGE_DEPTH,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Slot paths
// ---------------------------------------------------------------------------

/// Resolve a dotted slot path (`a.b.0.c`) inside a snapshot.
///
/// Numeric segments index into arrays. Returns `None` as soon as a segment
/// is missing or the path walks into a scalar.
pub fn lookup<'a>(data: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(fields) => fields.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Text form of a value at the render boundary.
///
/// Strings are verbatim, `null` is empty, everything else is compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
