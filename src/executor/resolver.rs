//! Target resolution against a snapshot.
//!
//! Platform UIs commonly wrap a non-interactive text node inside a clickable
//! container, and text is ambiguous where identifiers are not. CLICK targets
//! are therefore resolved through five tiers, each a full document-order
//! traversal of its own:
//!
//! 1. `ById`        clickable node whose id contains `target_id`; when
//!                  `target_text` is also given it must appear in the subtree.
//! 2. `OwnText`     clickable, non-editable node whose own text matches.
//! 3. `BubbleUp`    clickable, non-editable node that does not match itself
//!                  but has a direct child whose text matches.
//! 4. `Description` clickable, non-editable node whose description matches.
//! 5. `Fallback`    any clickable node whose text or description matches.
//!
//! The first structural match of a tier wins; there is no scoring.

use crate::perception::types::{Located, UiNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTier {
    ById,
    OwnText,
    BubbleUp,
    Description,
    Fallback,
}

pub const CLICK_TIERS: [ClickTier; 5] = [
    ClickTier::ById,
    ClickTier::OwnText,
    ClickTier::BubbleUp,
    ClickTier::Description,
    ClickTier::Fallback,
];

impl ClickTier {
    /// Runs this tier's traversal. Returns None when the tier does not apply
    /// (no id for `ById`, no text for the others) or nothing matches.
    pub fn find<'a>(
        self,
        root: &'a UiNode,
        target_text: Option<&str>,
        target_id: Option<&str>,
    ) -> Option<Located<'a>> {
        let text = target_text.filter(|t| !t.is_empty());
        match self {
            ClickTier::ById => {
                let id = target_id.filter(|i| !i.is_empty())?;
                root.find_first(|n| {
                    n.clickable
                        && n.id_contains(id)
                        && text.map_or(true, |t| subtree_contains(n, t))
                })
            }
            ClickTier::OwnText => {
                let t = text?;
                root.find_first(|n| n.clickable && !n.editable && n.text_contains(t))
            }
            ClickTier::BubbleUp => {
                let t = text?;
                root.find_first(|n| {
                    n.clickable
                        && !n.editable
                        && !n.text_contains(t)
                        && n.children.iter().any(|c| c.text_contains(t))
                })
            }
            ClickTier::Description => {
                let t = text?;
                root.find_first(|n| n.clickable && !n.editable && n.description_contains(t))
            }
            ClickTier::Fallback => {
                let t = text?;
                root.find_first(|n| n.clickable && (n.text_contains(t) || n.description_contains(t)))
            }
        }
    }
}

fn subtree_contains(node: &UiNode, target: &str) -> bool {
    node.text_contains(target)
        || node.description_contains(target)
        || node.children.iter().any(|c| subtree_contains(c, target))
}

/// First editable node matching the TYPE target. Text and hint are compared
/// with `target_text`; the id with `target_id`, or with `target_text` when no
/// id was given. With no target at all the first editable node is used.
pub fn find_editable<'a>(
    root: &'a UiNode,
    target_text: Option<&str>,
    target_id: Option<&str>,
) -> Option<Located<'a>> {
    let text = target_text.filter(|t| !t.is_empty());
    let id = target_id.filter(|i| !i.is_empty());

    root.find_first(|n| {
        if !n.editable {
            return false;
        }
        if text.is_none() && id.is_none() {
            return true;
        }
        let text_match = text.is_some_and(|t| {
            n.text_contains(t) || n.hint_contains(t) || (id.is_none() && n.id_contains(t))
        });
        let id_match = id.is_some_and(|i| n.id_contains(i));
        text_match || id_match
    })
}

pub fn find_scrollable(root: &UiNode) -> Option<Located<'_>> {
    root.find_first(|n| n.scrollable)
}
