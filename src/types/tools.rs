//! Tool definitions and the tagged tool payload codec
//!
//! Tool inputs and results travel as JSON objects whose shape is selected by
//! a discriminator field (`type`, with a nested `command` discriminator for
//! file-editor operations). The codec decodes the discriminator first, then
//! dispatches to the concrete shape; an unknown discriminator is always a
//! hard failure naming the offending value.

use serde::{Deserialize, Serialize};

use crate::error::GenError;
use crate::types::ToolCall;

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool type (usually "function")
    pub r#type: String,
    /// Function definition
    pub function: ToolFunction,
}

impl Tool {
    /// Create a new function tool
    pub fn function(name: String, description: String, parameters: serde_json::Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: ToolFunction {
                name,
                description,
                parameters,
            },
        }
    }
}

/// Tool function definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    /// Function name
    pub name: String,
    /// Function description
    pub description: String,
    /// JSON schema for function parameters
    pub parameters: serde_json::Value,
}

/// Typed input payload for the built-in tool families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolInput {
    /// Run code in the provider sandbox
    CodeInterpreter(RunCodeInput),
    /// Run a shell command
    Shell(RunShellInput),
    /// File-editor operation, selected by the nested `command` field
    FileEditor(FileEditorCommand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCodeInput {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunShellInput {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// File-editor sub-commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FileEditorCommand {
    View {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view_range: Option<[u64; 2]>,
    },
    Create {
        path: String,
        content: String,
    },
    Replace {
        path: String,
        old_text: String,
        new_text: String,
    },
}

impl ToolInput {
    /// Decode a tool input payload from raw JSON bytes.
    pub fn decode(data: &[u8]) -> Result<Self, GenError> {
        let value: serde_json::Value = serde_json::from_slice(data)?;
        Self::decode_value(value)
    }

    /// Decode a tool input payload from a parsed JSON value.
    ///
    /// The discriminator is read before anything else is assumed about the
    /// shape; the match below is the dispatch table.
    pub fn decode_value(value: serde_json::Value) -> Result<Self, GenError> {
        let tag = discriminator(&value, "type")?;
        match tag.as_str() {
            "code_interpreter" => Ok(Self::CodeInterpreter(from_shape(value)?)),
            "shell" => Ok(Self::Shell(from_shape(value)?)),
            "file_editor" => {
                let command = discriminator(&value, "command")?;
                match command.as_str() {
                    "view" | "create" | "replace" => Ok(Self::FileEditor(from_shape(value)?)),
                    other => Err(GenError::ParseError(format!(
                        "unknown file_editor command `{other}`"
                    ))),
                }
            }
            other => Err(GenError::ParseError(format!(
                "unknown tool input type `{other}`"
            ))),
        }
    }

    /// Encode back to JSON, re-emitting the discriminator used for dispatch.
    pub fn encode(&self) -> serde_json::Value {
        // Serialization of a closed enum cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Interpret a sealed tool call as a typed built-in input.
    ///
    /// The call's name supplies the discriminator and its parsed arguments
    /// supply the fields, matching the shape providers use on the wire.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, GenError> {
        let mut value = call.arguments.clone();
        if !value.is_object() {
            value = serde_json::json!({});
        }
        value["type"] = serde_json::Value::String(call.name.clone());
        Self::decode_value(value)
    }
}

/// Typed result payload for the built-in tool families
///
/// One success shape and one error shape per operation family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    CodeInterpreterResult(CodeRunResult),
    CodeInterpreterError(ToolErrorResult),
    ShellResult(ShellRunResult),
    ShellError(ToolErrorResult),
    FileEditorResult(FileEditorResult),
    FileEditorError(ToolErrorResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRunResult {
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellRunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEditorResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Shared error shape across operation families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolErrorResult {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ToolOutput {
    /// Decode a tool result payload from raw JSON bytes.
    pub fn decode(data: &[u8]) -> Result<Self, GenError> {
        let value: serde_json::Value = serde_json::from_slice(data)?;
        Self::decode_value(value)
    }

    /// Decode a tool result payload from a parsed JSON value.
    pub fn decode_value(value: serde_json::Value) -> Result<Self, GenError> {
        let tag = discriminator(&value, "type")?;
        match tag.as_str() {
            "code_interpreter_result" => Ok(Self::CodeInterpreterResult(from_shape(value)?)),
            "code_interpreter_error" => Ok(Self::CodeInterpreterError(from_shape(value)?)),
            "shell_result" => Ok(Self::ShellResult(from_shape(value)?)),
            "shell_error" => Ok(Self::ShellError(from_shape(value)?)),
            "file_editor_result" => Ok(Self::FileEditorResult(from_shape(value)?)),
            "file_editor_error" => Ok(Self::FileEditorError(from_shape(value)?)),
            other => Err(GenError::ParseError(format!(
                "unknown tool result type `{other}`"
            ))),
        }
    }

    /// Encode back to JSON, re-emitting the discriminator used for dispatch.
    pub fn encode(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Encode as a JSON string for embedding in a tool-result message.
    pub fn encode_string(&self) -> String {
        self.encode().to_string()
    }
}

fn discriminator(value: &serde_json::Value, field: &str) -> Result<String, GenError> {
    value
        .get(field)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            GenError::ParseError(format!("tool payload missing `{field}` discriminator"))
        })
}

fn from_shape<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, GenError> {
    serde_json::from_value(value)
        .map_err(|e| GenError::ParseError(format!("malformed tool payload: {e}")))
}
