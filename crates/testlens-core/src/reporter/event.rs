//! Protocol events and their one-line rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::escape::escape;

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    Info,
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// One lifecycle occurrence, rendered to exactly one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub message_type: MessageType,
    /// `None` omits the attributes object entirely.
    pub attributes: Option<Vec<(String, Option<String>)>>,
}

impl Event {
    /// An `Info` event with an empty attribute list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message_type: MessageType::Info,
            attributes: Some(Vec::new()),
        }
    }

    /// An `Info` event without an attributes object.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            attributes: None,
            ..Self::new(name)
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn attr(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.optional_attr(key, Some(value.into()))
    }

    /// Attribute rendered as JSON `null` when `value` is `None`.
    pub fn optional_attr(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.attributes
            .get_or_insert_with(Vec::new)
            .push((key.into(), value));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Render as `@@<TestRunner-{...}-TestRunner>`, without a line terminator.
    pub fn render(&self) -> String {
        let mut line = format!(
            "@@<TestRunner-{{\"name\":\"{}\", \"type\":\"{}\"",
            self.name, self.message_type
        );

        if let Some(attributes) = &self.attributes {
            let rendered: Vec<String> = attributes
                .iter()
                .map(|(key, value)| match value {
                    Some(value) => format!("\"{}\":\"{}\"", key, escape(value)),
                    None => format!("\"{}\":null", key),
                })
                .collect();
            line.push_str(", \"attributes\":{");
            line.push_str(&rendered.join(", "));
            line.push('}');
        }

        line.push_str("}-TestRunner>");
        line
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
