use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PlannerError;

/// Requests fed into the engine task.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    GoalReceived(String),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// One planner decision, validated at decode time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentAction {
    Click {
        target_text: Option<String>,
        target_id: Option<String>,
    },
    Type {
        target_text: Option<String>,
        target_id: Option<String>,
        input_text: String,
    },
    Scroll { direction: ScrollDirection },
    Back,
    Home,
    Done,
}

impl AgentAction {
    pub fn kind(&self) -> StepKind {
        match self {
            AgentAction::Click { .. } => StepKind::Click,
            AgentAction::Type { .. } => StepKind::Type,
            AgentAction::Scroll { .. } => StepKind::Scroll,
            AgentAction::Back => StepKind::Back,
            AgentAction::Home => StepKind::Home,
            AgentAction::Done => StepKind::Done,
        }
    }

    pub fn target_text(&self) -> Option<&str> {
        match self {
            AgentAction::Click { target_text, .. } | AgentAction::Type { target_text, .. } => {
                target_text.as_deref()
            }
            AgentAction::Scroll {
                direction: ScrollDirection::Backward,
            } => Some("UP"),
            AgentAction::Scroll {
                direction: ScrollDirection::Forward,
            } => Some("DOWN"),
            _ => None,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        match self {
            AgentAction::Click { target_id, .. } | AgentAction::Type { target_id, .. } => {
                target_id.as_deref()
            }
            _ => None,
        }
    }
}

/// Planner output: `{action_type, target_text?, target_id?, input_text?, reasoning?}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawProposal")]
pub struct ActionProposal {
    pub action: AgentAction,
    pub reasoning: Option<String>,
}

#[derive(Deserialize)]
struct RawProposal {
    action_type: String,
    #[serde(default)]
    target_text: Option<String>,
    #[serde(default)]
    target_id: Option<String>,
    #[serde(default)]
    input_text: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

impl TryFrom<RawProposal> for ActionProposal {
    type Error = String;

    fn try_from(raw: RawProposal) -> Result<Self, Self::Error> {
        let target_text = blank_to_none(raw.target_text);
        let target_id = blank_to_none(raw.target_id);

        let action = match raw.action_type.trim().to_ascii_uppercase().as_str() {
            "CLICK" => {
                if target_text.is_none() && target_id.is_none() {
                    return Err("CLICK requires target_text or target_id".into());
                }
                AgentAction::Click {
                    target_text,
                    target_id,
                }
            }
            "TYPE" => AgentAction::Type {
                target_text,
                target_id,
                input_text: raw
                    .input_text
                    .ok_or_else(|| "TYPE requires input_text".to_string())?,
            },
            "SCROLL" => AgentAction::Scroll {
                direction: match target_text.as_deref() {
                    Some(t) if t.eq_ignore_ascii_case("UP") => ScrollDirection::Backward,
                    _ => ScrollDirection::Forward,
                },
            },
            "BACK" => AgentAction::Back,
            "HOME" => AgentAction::Home,
            "DONE" => AgentAction::Done,
            other => return Err(format!("unknown action_type '{other}'")),
        };

        Ok(Self {
            action,
            reasoning: blank_to_none(raw.reasoning),
        })
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ActionProposal {
    pub fn from_json(json: &str) -> Result<Self, PlannerError> {
        serde_json::from_str(json).map_err(|e| PlannerError::ParseError(e.to_string()))
    }

    pub fn is_done(&self) -> bool {
        matches!(self.action, AgentAction::Done)
    }

    /// Line appended to the action history shown to the planner.
    pub fn to_history_entry(&self, step: u32, success: bool) -> String {
        let status = if success { "SUCCESS" } else { "FAILED" };
        let mut line = format!("Step {step} [{status}]: {}", self.action.kind());
        if let Some(target) = self.action.target_text() {
            line.push_str(&format!(" on '{target}'"));
        }
        if let AgentAction::Type { input_text, .. } = &self.action {
            line.push_str(&format!(" with text '{input_text}'"));
        }
        line.push_str(" - ");
        line.push_str(self.reasoning.as_deref().unwrap_or(""));
        line
    }
}

/// Action column of a step log entry. `Error` and `System` are injected by
/// the engine, never proposed by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    Click,
    Type,
    Scroll,
    Back,
    Home,
    Done,
    Error,
    System,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepKind::Click => "CLICK",
            StepKind::Type => "TYPE",
            StepKind::Scroll => "SCROLL",
            StepKind::Back => "BACK",
            StepKind::Home => "HOME",
            StepKind::Done => "DONE",
            StepKind::Error => "ERROR",
            StepKind::System => "SYSTEM",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: u32,
    pub action_type: StepKind,
    pub target_text: Option<String>,
    pub reasoning: Option<String>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(
        step: u32,
        action_type: StepKind,
        target_text: Option<String>,
        reasoning: Option<String>,
        success: bool,
    ) -> Self {
        Self {
            step,
            action_type,
            target_text,
            reasoning,
            success,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Observable state of the current run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,
    pub command: Option<String>,
    pub current_step: u32,
    pub max_steps: u32,
    pub current_reasoning: Option<String>,
    pub live_steps: Vec<StepRecord>,
    pub cancel_requested: bool,
}

/// Summary of one finished run, handed to an `ExecutionSink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: uuid::Uuid,
    pub command: String,
    pub status: RunStatus,
    pub result_message: String,
    pub steps: Vec<StepRecord>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// What `AgentEngine::run` returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub message: String,
    pub steps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_click_case_insensitive() {
        let p = ActionProposal::from_json(
            r#"{"action_type":"click","target_text":"Settings","reasoning":"open it"}"#,
        )
        .unwrap();
        assert_eq!(
            p.action,
            AgentAction::Click {
                target_text: Some("Settings".into()),
                target_id: None
            }
        );
        assert_eq!(p.reasoning.as_deref(), Some("open it"));
    }

    #[test]
    fn test_decode_rejects_unknown_action() {
        let err = ActionProposal::from_json(r#"{"action_type":"SWIPE"}"#).unwrap_err();
        match err {
            PlannerError::ParseError(msg) => assert!(msg.contains("SWIPE")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_validates_required_fields() {
        assert!(ActionProposal::from_json(r#"{"action_type":"TYPE","target_text":"Search"}"#).is_err());
        assert!(ActionProposal::from_json(r#"{"action_type":"CLICK","target_text":"  "}"#).is_err());
        assert!(ActionProposal::from_json(r#"{"target_text":"x"}"#).is_err());

        let p = ActionProposal::from_json(r#"{"action_type":"CLICK","target_id":"searchBtn"}"#).unwrap();
        assert_eq!(p.action.target_id(), Some("searchBtn"));
    }

    #[test]
    fn test_decode_scroll_direction() {
        let up = ActionProposal::from_json(r#"{"action_type":"SCROLL","target_text":"up"}"#).unwrap();
        assert_eq!(
            up.action,
            AgentAction::Scroll {
                direction: ScrollDirection::Backward
            }
        );
        let plain = ActionProposal::from_json(r#"{"action_type":"SCROLL"}"#).unwrap();
        assert_eq!(
            plain.action,
            AgentAction::Scroll {
                direction: ScrollDirection::Forward
            }
        );
    }

    #[test]
    fn test_history_entry_format() {
        let p = ActionProposal::from_json(
            r#"{"action_type":"TYPE","target_text":"Search","input_text":"weather","reasoning":"find it"}"#,
        )
        .unwrap();
        assert_eq!(
            p.to_history_entry(2, false),
            "Step 2 [FAILED]: TYPE on 'Search' with text 'weather' - find it"
        );
    }

    #[test]
    fn test_step_kind_serializes_uppercase() {
        let json = serde_json::to_string(&StepKind::System).unwrap();
        assert_eq!(json, "\"SYSTEM\"");
        assert!(RunStatus::Cancelled.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
