use std::fmt;
use std::ops::Range;

use hashlink::LinkedHashMap;
use serde::{Deserialize, Deserializer, Serialize};

// ----------------- FieldValue -----------------

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    /// Kept as the JSON number. Integers keep their digits; decimals print
    /// in shortest form, so `95.50` reads back as `95.5`.
    Number(serde_json::Number),
    String(String),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => FieldValue::Number(n),
            serde_json::Value::String(s) => FieldValue::String(s),
            // nested structures are kept as their JSON text
            other => FieldValue::String(other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::String(s) => write!(f, "{}", s),
        }
    }
}

// ----------------- ExtractedFieldSet -----------------

/// Field name to value, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFieldSet {
    fields: LinkedHashMap<String, FieldValue>,
}

impl ExtractedFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites; an overwritten key keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.get_mut(&name) {
            Some(slot) => *slot = value,
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for ExtractedFieldSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ExtractedFieldSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

// ----------------- PlaceholderSlot -----------------

/// Which detection pass produced a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOrigin {
    BareMarker,
    AlternateSyntax,
    Structural,
    /// Catalog field standing in for a template where nothing was found.
    Fallback,
}

/// A raw hit reported by a detection strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Byte range to replace; empty for an insertion point.
    pub span: Range<usize>,
    pub candidate_name: Option<String>,
}

/// A fill-in position of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderSlot {
    pub index: usize,
    /// `None` only for [`SlotOrigin::Fallback`] slots.
    pub span: Option<Range<usize>>,
    pub context_before: String,
    pub context_after: String,
    pub candidate_name: Option<String>,
    pub name: String,
    pub origin: SlotOrigin,
}

impl PlaceholderSlot {
    /// The text around the slot, marker excluded.
    pub fn local_context(&self) -> String {
        match (self.context_before.is_empty(), self.context_after.is_empty()) {
            (false, false) => format!("{} {}", self.context_before, self.context_after),
            (false, true) => self.context_before.clone(),
            (true, _) => self.context_after.clone(),
        }
    }

    pub fn has_context(&self) -> bool {
        !self.context_before.trim().is_empty() || !self.context_after.trim().is_empty()
    }
}

impl fmt::Display for PlaceholderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.name)?;
        if let Some(span) = &self.span {
            write!(f, " @{}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

// ----------------- Template -----------------

/// A template text and the slots found in it.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    content: String,
    slots: Vec<PlaceholderSlot>,
}

impl Template {
    pub(crate) fn new(id: String, content: String, slots: Vec<PlaceholderSlot>) -> Self {
        Self { id, content, slots }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn slots(&self) -> &[PlaceholderSlot] {
        &self.slots
    }

    /// Slot names in document order, duplicates removed.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for slot in &self.slots {
            if !names.contains(&slot.name) {
                names.push(slot.name.clone());
            }
        }
        names
    }
}

// ----------------- Matching -----------------

/// How a slot got its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// Slot name equals the field name.
    Named,
    Scored,
    /// Degraded document-order assignment.
    Positional,
    Unmatched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub slot_index: usize,
    pub field: Option<String>,
    pub score: u32,
    pub source: MatchSource,
}

impl MatchResult {
    pub fn unmatched(slot_index: usize) -> Self {
        Self {
            slot_index,
            field: None,
            score: 0,
            source: MatchSource::Unmatched,
        }
    }
}

/// Whether a chosen field leaves the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// One field may fill several slots.
    #[default]
    NonConsuming,
    /// Each field fills at most one slot per pass.
    Consuming,
}

// ----------------- Traits -----------------

/// A way of finding fill-in positions in flattened template text.
pub trait DetectionStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;
    fn origin(&self) -> SlotOrigin;
    fn detect(&self, text: &str) -> Vec<Detection>;
}
