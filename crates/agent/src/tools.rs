use serde_json::{json, Value};
use thiserror::Error;
use twin_core::domain::contact::ContactRequest;
use twin_core::errors::DomainError;
use twin_core::prompts::CONTACT_TOOL_NAME;

use crate::contact::validator::{validate_request, ValidatedContactRequest};
use crate::llm::ToolSpec;

/// The closed set of actions the model may ask for.
///
/// Parsing is the trust boundary: a `ToolCommand` only exists once the
/// arguments deserialized and the recruiter address passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCommand {
    ContactRequest(ValidatedContactRequest),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid arguments for `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error(transparent)]
    InvalidAddress(#[from] DomainError),
}

impl ToolError {
    /// Text handed back to the model as the tool result so it can relay the problem.
    pub fn tool_output(&self) -> String {
        match self {
            Self::UnknownTool(name) => {
                format!("Error: the tool `{name}` is not available. Only {CONTACT_TOOL_NAME} can be used.")
            }
            Self::InvalidArguments { reason, .. } => format!(
                "Error: the contact request was incomplete ({reason}). \
                 Ask the recruiter for their email address and message, then try again."
            ),
            Self::InvalidAddress(DomainError::InvalidAddress(address)) => format!(
                "Error: `{address}` is not a valid email address. \
                 Ask the recruiter to provide a valid email address."
            ),
            Self::InvalidAddress(other) => format!("Error: {other}"),
        }
    }
}

impl ToolCommand {
    pub fn parse(name: &str, arguments: &Value) -> Result<Self, ToolError> {
        if name != CONTACT_TOOL_NAME {
            return Err(ToolError::UnknownTool(name.to_string()));
        }

        let request: ContactRequest =
            serde_json::from_value(arguments.clone()).map_err(|error| ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: error.to_string(),
            })?;
        let validated = validate_request(request)?;
        Ok(Self::ContactRequest(validated))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ContactRequest(_) => CONTACT_TOOL_NAME,
        }
    }
}

pub fn contact_tool_spec() -> ToolSpec {
    ToolSpec {
        name: CONTACT_TOOL_NAME,
        description: "Send an email to the represented person on behalf of a recruiter. \
                      Use this when the recruiter wants to get in touch, send a message, \
                      or schedule a call."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "recruiter_email": {
                    "type": "string",
                    "description": "The recruiter's email address for follow-up"
                },
                "message": {
                    "type": "string",
                    "description": "The recruiter's message or reason for reaching out"
                },
                "conversation_history": {
                    "type": "string",
                    "description": "The full conversation history between the recruiter and the agent"
                }
            },
            "required": ["recruiter_email", "message", "conversation_history"]
        }),
    }
}
