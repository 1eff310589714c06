//! Command descriptors and the command set loaded from a command file.

use crate::error::{ConfigError, LoadError};
use log::warn;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// A named command document. The whole document, `id` included, is the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDescriptor {
    id: String,
    payload: Value,
}

impl CommandDescriptor {
    /// Build a descriptor from a JSON object carrying a non-empty string `id`.
    pub fn from_value(payload: Value, context: &str) -> Result<Self, LoadError> {
        let id = match &payload {
            Value::Object(fields) => match fields.get("id") {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                Some(Value::String(_)) => {
                    return Err(LoadError::from_parse_error("'id' is empty", context));
                }
                Some(_) => {
                    return Err(LoadError::from_parse_error("'id' must be a string", context));
                }
                None => return Err(LoadError::from_parse_error("missing 'id'", context)),
            },
            other => {
                return Err(LoadError::from_parse_error(
                    format!("expected an object, found {}", json_kind(other)),
                    context,
                ));
            }
        };
        Ok(Self { id, payload })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// How the commands were laid out in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandLayout {
    Single,
    List,
}

/// Ordered, immutable set of commands for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet {
    commands: Vec<CommandDescriptor>,
    layout: CommandLayout,
}

impl CommandSet {
    /// Interpret a parsed document: one object, or an array of objects.
    pub fn from_value(document: Value) -> Result<Self, LoadError> {
        let (commands, layout) = match document {
            Value::Object(_) => (
                vec![CommandDescriptor::from_value(document, "command")?],
                CommandLayout::Single,
            ),
            Value::Array(items) => {
                let commands = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| {
                        CommandDescriptor::from_value(item, &format!("command list entry {index}"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (commands, CommandLayout::List)
            }
            other => {
                return Err(LoadError::from_parse_error(
                    format!(
                        "expected an object or an array of objects, found {}",
                        json_kind(&other)
                    ),
                    "command source",
                ));
            }
        };

        let mut seen = HashSet::new();
        for command in &commands {
            if !seen.insert(command.id()) {
                warn!(
                    "Duplicate command id '{}' in command set; lookups use the first occurrence",
                    command.id()
                );
            }
        }

        Ok(Self { commands, layout })
    }

    pub fn all(&self) -> &[CommandDescriptor] {
        &self.commands
    }

    pub fn ids(&self) -> Vec<&str> {
        self.commands.iter().map(CommandDescriptor::id).collect()
    }

    pub fn layout(&self) -> CommandLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// First descriptor with the given id.
    pub fn find_by_id(&self, id: &str) -> Result<&CommandDescriptor, ConfigError> {
        self.commands
            .iter()
            .find(|command| command.id() == id)
            .ok_or_else(|| ConfigError::CommandNotFound {
                command_id: id.to_string(),
            })
    }

    /// Narrow the set to the single named command.
    pub fn restrict_to(&self, id: &str) -> Result<CommandSet, ConfigError> {
        let command = self.find_by_id(id)?;
        Ok(CommandSet {
            commands: vec![command.clone()],
            layout: self.layout,
        })
    }
}

/// Reads command sets from JSON or YAML files.
pub struct CommandSetLoader;

impl CommandSetLoader {
    /// Load a command set from a file path.
    /// `.yaml`/`.yml` files are parsed as YAML, `.json` as JSON, anything else tries both.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<CommandSet, LoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| LoadError::from_io_error(e, &display))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        let document: Value = match extension.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| LoadError::from_parse_error(e, &format!("JSON file '{display}'")))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| LoadError::from_parse_error(e, &format!("YAML file '{display}'")))?,
            _ => serde_json::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .map_err(|e| {
                    LoadError::from_parse_error(
                        e,
                        &format!("file '{display}' (tried both JSON and YAML)"),
                    )
                })?,
        };

        CommandSet::from_value(document)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
