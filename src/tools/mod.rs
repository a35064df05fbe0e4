//! Tool-call interpretation for the voice assistant.
//!
//! The realtime transport surfaces structured tool calls (name + JSON
//! arguments + correlation id). This module owns the static table of the
//! eight reserved tools, maps calls onto `DraftChange` construction or the
//! bulk accept/reject control verbs, and builds the `function_call_output`
//! acknowledgment echoed for every processed call.
//!
//! Nothing here returns an error to the transport: malformed arguments and
//! unknown names are logged and degrade to `ToolAction::Ignored` with a
//! failure acknowledgment.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::models::{DraftChange, DraftPayload, Timeline};

/// Control verb: accept every pending draft for the active project.
pub const ACCEPT_TOOL: &str = "accept_draft_changes";
/// Control verb: reject every pending draft for the active project.
pub const REJECT_TOOL: &str = "reject_draft_changes";

/// Realtime model requested at session creation.
pub const MODEL: &str = "gpt-4o-realtime-preview";
/// Voice requested at session creation.
pub const VOICE: &str = "coral";

/// Instructions sent to the assistant when the session opens.
pub const INSTRUCTIONS: &str = "\
You are an AI assistant helping manage software development projects, specifically focused on \
AI/algorithm development and IT deployment timelines.

You can help users:
- Update project status and descriptions
- Add milestones to algorithm development or IT deployment timelines
- Add entries to the recent updates log
- Update anticipated next updates
- Mark milestones as completed

When users mention adding milestones, ask which timeline they want (algorithm development or IT \
deployment) if not specified.

For dates, if the user says relative terms like \"next Friday\", \"in two weeks\", or \"end of \
month\", convert them to specific YYYY-MM-DD format dates.

Always create drafts for changes that require user approval - don't assume you should make \
changes immediately. The draft system allows users to review and approve changes before they \
become permanent.

When you make changes, they will appear highlighted in the interface as drafts. After making \
changes, ask the user if they want to accept or reject them. When they say \"yes\", \"accept\", \
\"approve\", or similar confirmation, use the accept_draft_changes tool. When they say \"no\", \
\"reject\", \"cancel\", or similar rejection, use the reject_draft_changes tool.

Be conversational and helpful, and confirm what actions you're taking. When you update \
something, briefly summarize what you changed and ask for confirmation.

Respond concisely and naturally. If you need clarification on dates or which timeline to use, \
ask for it.";

/// A structured command emitted by the voice assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name, one of the eight reserved identifiers
    pub name: String,
    /// Raw JSON-encoded argument object, exactly as the transport delivers it
    pub arguments: String,
    /// Correlation token echoed back in the acknowledgment
    pub call_id: String,
}

/// What a tool call asks the dashboard to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    /// Queue a new pending draft
    CreateDraft(DraftChange),
    /// Accept every pending draft for the active project
    AcceptAll,
    /// Reject every pending draft for the active project
    RejectAll,
    /// Unknown tool or malformed arguments; nothing to do
    Ignored,
}

/// The `function_call_output` acknowledgment for a processed call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub call_id: String,
    pub output: Value,
}

impl ToolOutput {
    fn success(call_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            output: json!({ "success": true }),
        }
    }

    fn success_with_message(call_id: &str, message: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            output: json!({ "success": true, "message": message }),
        }
    }

    fn failure(call_id: &str, error: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            output: json!({ "success": false, "error": error }),
        }
    }

    /// Build the `conversation.item.create` event carrying this
    /// acknowledgment over the data channel.
    pub fn to_client_event(&self) -> Value {
        json!({
            "type": "conversation.item.create",
            "item": {
                "type": "function_call_output",
                "call_id": self.call_id,
                "output": self.output.to_string(),
            }
        })
    }
}

/// How a tool's arguments are handled.
enum Handler {
    /// Parse arguments into a draft payload
    Draft(fn(&str) -> serde_json::Result<DraftPayload>),
    AcceptAll,
    RejectAll,
}

/// A tool exposed to the realtime session.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    handler: Handler,
    parameters: fn() -> Value,
}

// === Argument shapes, as declared to the assistant ===

#[derive(Deserialize)]
struct StatusArgs {
    status: String,
}

#[derive(Deserialize)]
struct MilestoneArgs {
    title: String,
    timeline: Timeline,
    date: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct UpdateArgs {
    content: String,
}

#[derive(Deserialize)]
struct AnticipatedArgs {
    #[serde(rename = "nextUpdate")]
    next_update: String,
}

#[derive(Deserialize)]
struct DescriptionArgs {
    description: String,
}

#[derive(Deserialize)]
struct CompleteArgs {
    #[serde(rename = "milestoneTitle")]
    milestone_title: String,
    timeline: Timeline,
}

fn parse_status(args: &str) -> serde_json::Result<DraftPayload> {
    let args: StatusArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::StatusUpdate { status: args.status })
}

fn parse_milestone(args: &str) -> serde_json::Result<DraftPayload> {
    let args: MilestoneArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::MilestoneAdd {
        title: args.title,
        timeline: args.timeline,
        date: args.date,
        description: args.description,
    })
}

fn parse_update(args: &str) -> serde_json::Result<DraftPayload> {
    let args: UpdateArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::ProjectUpdate {
        update_content: args.content,
    })
}

fn parse_anticipated(args: &str) -> serde_json::Result<DraftPayload> {
    let args: AnticipatedArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::AnticipatedUpdate {
        next_update: args.next_update,
    })
}

fn parse_description(args: &str) -> serde_json::Result<DraftPayload> {
    let args: DescriptionArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::DescriptionUpdate {
        description: args.description,
    })
}

fn parse_complete(args: &str) -> serde_json::Result<DraftPayload> {
    let args: CompleteArgs = serde_json::from_str(args)?;
    Ok(DraftPayload::MilestoneComplete {
        milestone_title: args.milestone_title,
        timeline: args.timeline,
    })
}

// === Parameter schemas, as declared to the assistant ===

fn status_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "status": {
                "type": "string",
                "description": "The new status for the project (e.g., 'In Progress', 'Blocked', 'Planning', 'In Review')"
            }
        },
        "required": ["status"]
    })
}

fn milestone_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {
                "type": "string",
                "description": "The title of the milestone"
            },
            "timeline": {
                "type": "string",
                "enum": ["algorithm", "deployment"],
                "description": "Which timeline to add the milestone to"
            },
            "date": {
                "type": "string",
                "description": "The target date for the milestone in YYYY-MM-DD format"
            },
            "description": {
                "type": "string",
                "description": "Optional description for the milestone"
            }
        },
        "required": ["title", "timeline", "date"]
    })
}

fn update_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": {
                "type": "string",
                "description": "The update content to add to the recent updates"
            }
        },
        "required": ["content"]
    })
}

fn anticipated_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "nextUpdate": {
                "type": "string",
                "description": "The anticipated next update (e.g., '2025-06-01 - Review meeting')"
            }
        },
        "required": ["nextUpdate"]
    })
}

fn description_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "description": {
                "type": "string",
                "description": "The new description for the project"
            }
        },
        "required": ["description"]
    })
}

fn complete_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "milestoneTitle": {
                "type": "string",
                "description": "The title of the milestone to mark as completed"
            },
            "timeline": {
                "type": "string",
                "enum": ["algorithm", "deployment"],
                "description": "Which timeline the milestone is on"
            }
        },
        "required": ["milestoneTitle", "timeline"]
    })
}

fn empty_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

/// The eight reserved tools, in manifest order.
static TOOLS: &[ToolDef] = &[
    ToolDef {
        name: "update_project_status",
        description: "Update the status of the current project",
        handler: Handler::Draft(parse_status),
        parameters: status_parameters,
    },
    ToolDef {
        name: "add_milestone",
        description: "Add a new milestone to either the algorithm development or IT deployment timeline",
        handler: Handler::Draft(parse_milestone),
        parameters: milestone_parameters,
    },
    ToolDef {
        name: "add_recent_update",
        description: "Add an entry to the recent updates log",
        handler: Handler::Draft(parse_update),
        parameters: update_parameters,
    },
    ToolDef {
        name: "update_next_anticipated",
        description: "Update the anticipated next update field",
        handler: Handler::Draft(parse_anticipated),
        parameters: anticipated_parameters,
    },
    ToolDef {
        name: "update_project_description",
        description: "Update the project description",
        handler: Handler::Draft(parse_description),
        parameters: description_parameters,
    },
    ToolDef {
        name: "complete_milestone",
        description: "Mark a milestone as completed",
        handler: Handler::Draft(parse_complete),
        parameters: complete_parameters,
    },
    ToolDef {
        name: ACCEPT_TOOL,
        description: "Accept all pending draft changes when the user confirms",
        handler: Handler::AcceptAll,
        parameters: empty_parameters,
    },
    ToolDef {
        name: REJECT_TOOL,
        description: "Reject all pending draft changes when the user declines",
        handler: Handler::RejectAll,
        parameters: empty_parameters,
    },
];

/// Look up a tool definition by name.
pub fn lookup(name: &str) -> Option<&'static ToolDef> {
    TOOLS.iter().find(|t| t.name == name)
}

/// All tool definitions in wire form, in manifest order.
pub fn tool_definitions() -> Vec<Value> {
    TOOLS
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "name": t.name,
                "description": t.description,
                "parameters": (t.parameters)(),
            })
        })
        .collect()
}

/// Build the `session.update` event configuring tools and instructions,
/// sent when the data channel opens.
pub fn session_update_event() -> Value {
    json!({
        "type": "session.update",
        "session": {
            "tools": tool_definitions(),
            "instructions": INSTRUCTIONS,
        }
    })
}

/// Interpret a tool call against the active project.
///
/// Always returns an acknowledgment keyed by the call's correlation id, even
/// when the call is malformed or unknown.
pub fn interpret(call: &ToolCall, project_id: &str) -> (ToolAction, ToolOutput) {
    let Some(def) = lookup(&call.name) else {
        tracing::warn!(name = %call.name, "unknown tool call");
        return (
            ToolAction::Ignored,
            ToolOutput::failure(&call.call_id, "unknown tool"),
        );
    };

    match &def.handler {
        Handler::AcceptAll => (
            ToolAction::AcceptAll,
            ToolOutput::success_with_message(
                &call.call_id,
                "All draft changes have been accepted",
            ),
        ),
        Handler::RejectAll => (
            ToolAction::RejectAll,
            ToolOutput::success_with_message(
                &call.call_id,
                "All draft changes have been rejected",
            ),
        ),
        Handler::Draft(parse) => match parse(&call.arguments) {
            Ok(payload) => {
                let draft = DraftChange::new(project_id.to_string(), payload);
                (ToolAction::CreateDraft(draft), ToolOutput::success(&call.call_id))
            }
            Err(e) => {
                tracing::warn!(name = %call.name, error = %e, "malformed tool arguments");
                (
                    ToolAction::Ignored,
                    ToolOutput::failure(&call.call_id, "malformed arguments"),
                )
            }
        },
    }
}
