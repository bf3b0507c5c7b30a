//! Purpose: Model the field map a remote service returns when it rejects a write.
//! Exports: `FieldErrors`.
//! Role: Shared by the gateway (decode), the form (per-field display), and the dashboard (flatten).
//! Invariants: Every present field has at least one message.
//! Invariants: Field order is preserved from insertion; decoded maps follow JSON key order.
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a 400 response body; `None` unless the top level is a JSON object.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut fields = Self::new();
        for (field, messages) in object {
            match messages {
                Value::String(message) => fields.push(field.clone(), message.clone()),
                Value::Array(items) => {
                    for item in items {
                        fields.push(field.clone(), message_text(item));
                    }
                }
                other => fields.push(field.clone(), message_text(other)),
            }
        }
        Some(fields)
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// Messages for one field joined with ", ", as shown beneath an input.
    pub fn joined(&self, field: &str) -> Option<String> {
        let messages = self.messages(field);
        if messages.is_empty() {
            None
        } else {
            Some(messages.join(", "))
        }
    }

    /// One line for surfaces with no per-field display: `field: a, b; other: c`.
    pub fn flatten(&self) -> String {
        self.entries
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
