// Proposal → device primitive.
use crate::agent_engine::state::AgentAction;
use crate::executor::device::Device;
use crate::executor::resolver::{find_editable, find_scrollable, CLICK_TIERS};
use crate::perception::types::UiNode;

/// Executes one action against the live UI, resolving targets in `snapshot`.
///
/// Returns `false` when no node resolves or the platform refuses the action;
/// both are routine outcomes. `Done` is a no-op that succeeds.
pub fn execute(snapshot: &UiNode, device: &dyn Device, action: &AgentAction) -> bool {
    let success = match action {
        AgentAction::Click {
            target_text,
            target_id,
        } => smart_click(snapshot, device, target_text.as_deref(), target_id.as_deref()),
        AgentAction::Type {
            target_text,
            target_id,
            input_text,
        } => type_into(
            snapshot,
            device,
            target_text.as_deref(),
            target_id.as_deref(),
            input_text,
        ),
        AgentAction::Scroll { direction } => match find_scrollable(snapshot) {
            Some(target) => device.scroll(&target, *direction),
            None => {
                tracing::warn!("no scrollable node on screen");
                false
            }
        },
        AgentAction::Back => device.global_back(),
        AgentAction::Home => device.global_home(),
        AgentAction::Done => true,
    };

    if success {
        tracing::debug!(?action, "action succeeded");
    } else {
        tracing::warn!(?action, "action failed");
    }
    success
}

fn smart_click(
    snapshot: &UiNode,
    device: &dyn Device,
    target_text: Option<&str>,
    target_id: Option<&str>,
) -> bool {
    for tier in CLICK_TIERS {
        let Some(target) = tier.find(snapshot, target_text, target_id) else {
            tracing::trace!(?tier, "no match");
            continue;
        };
        tracing::info!(
            ?tier,
            path = ?target.path,
            id = target.node.element_id.as_deref().unwrap_or("-"),
            text = target.node.text.as_deref().unwrap_or("-"),
            "click target resolved"
        );
        if device.tap(&target) {
            return true;
        }
        tracing::warn!(?tier, "tap refused; trying next tier");
    }
    false
}

fn type_into(
    snapshot: &UiNode,
    device: &dyn Device,
    target_text: Option<&str>,
    target_id: Option<&str>,
    input_text: &str,
) -> bool {
    let Some(target) = find_editable(snapshot, target_text, target_id) else {
        tracing::warn!(target = ?target_text, id = ?target_id, "no editable node matches");
        return false;
    };
    tracing::info!(
        path = ?target.path,
        id = target.node.element_id.as_deref().unwrap_or("-"),
        "typing into field"
    );
    if !device.focus(&target) {
        tracing::debug!("focus refused; setting text anyway");
    }
    device.set_text(&target, input_text)
}
