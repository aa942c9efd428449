//! Positional tag captures for one clause attempt

use std::borrow::Cow;

/// Which part of a capture a template refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureField {
    /// The tag key
    Key,
    /// The tag value
    Value,
    /// `key=value`
    Tag,
}

impl std::str::FromStr for CaptureField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key" => Ok(CaptureField::Key),
            "value" => Ok(CaptureField::Value),
            "tag" => Ok(CaptureField::Tag),
            _ => Err(format!("Unknown capture field: {}", s)),
        }
    }
}

/// A captured tag, borrowed from the feature's tag map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture<'t> {
    pub key: &'t str,
    pub value: &'t str,
}

/// Fixed-size capture registry, sized by the clause at compile time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captures<'t> {
    slots: Box<[Option<Capture<'t>>]>,
}

impl<'t> Captures<'t> {
    /// Create a registry with `len` empty slots
    pub fn with_slots(len: usize) -> Self {
        Self {
            slots: vec![None; len].into_boxed_slice(),
        }
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write a slot. Returns false if the slot is out of range or already set.
    pub fn set(&mut self, slot: usize, key: &'t str, value: &'t str) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry @ None) => {
                *entry = Some(Capture { key, value });
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, slot: usize) -> Option<&Capture<'t>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_set(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Render one field of a slot
    pub fn field(&self, slot: usize, field: CaptureField) -> Option<Cow<'t, str>> {
        let capture = *self.get(slot)?;
        Some(match field {
            CaptureField::Key => Cow::Borrowed(capture.key),
            CaptureField::Value => Cow::Borrowed(capture.value),
            CaptureField::Tag => Cow::Owned(format!("{}={}", capture.key, capture.value)),
        })
    }
}
