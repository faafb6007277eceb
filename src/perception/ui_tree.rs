//! Accessibility tree capture.
//!
//! Walks the platform's live tree depth-first and copies every node into an
//! owned `UiNode`. Nothing from the platform tree is retained, so the source
//! may be recycled as soon as `capture` returns.

use crate::perception::traits::PlatformNode;
use crate::perception::types::UiNode;

/// Guard against pathological or cyclic platform trees.
const MAX_CAPTURE_DEPTH: usize = 64;

pub fn capture<N: PlatformNode>(root: &N) -> UiNode {
    let tree = capture_node(root, 0);
    tracing::debug!(nodes = tree.node_count(), "ui tree captured");
    tree
}

fn capture_node<N: PlatformNode>(node: &N, depth: usize) -> UiNode {
    let children = if depth < MAX_CAPTURE_DEPTH {
        (0..node.child_count())
            .filter_map(|i| node.child(i))
            .map(|child| capture_node(&child, depth + 1))
            .collect()
    } else {
        tracing::warn!(depth, "ui tree deeper than capture limit; children dropped");
        Vec::new()
    };

    UiNode {
        text: non_empty(node.text()),
        hint_text: non_empty(node.hint_text()),
        description: non_empty(node.description()),
        element_id: non_empty(node.element_id()),
        package_name: non_empty(node.package_name()),
        class_name: non_empty(node.class_name()),
        bounds: node.bounds(),
        clickable: node.is_clickable(),
        editable: node.is_editable(),
        scrollable: node.is_scrollable(),
        children,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Debug dump of the nodes that carry something a planner can target.
pub fn log_tree(node: &UiNode) {
    log_node(node, 0);
}

fn log_node(node: &UiNode, depth: usize) {
    if node.text.is_some() || node.element_id.is_some() || node.description.is_some() {
        tracing::debug!(
            "{}[{}] id={} | text={} | desc={} | editable={} | clickable={}",
            "  ".repeat(depth),
            node.class_name.as_deref().unwrap_or("?"),
            node.element_id.as_deref().unwrap_or("-"),
            node.text.as_deref().unwrap_or("-"),
            node.description.as_deref().unwrap_or("-"),
            node.editable,
            node.clickable,
        );
    }
    for child in &node.children {
        log_node(child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perception::types::Bounds;

    #[derive(Clone, Default)]
    struct FakeNode {
        text: Option<String>,
        id: Option<String>,
        clickable: bool,
        children: Vec<FakeNode>,
        /// Simulates a child that vanished while walking.
        missing_child: Option<usize>,
    }

    impl PlatformNode for FakeNode {
        fn text(&self) -> Option<String> {
            self.text.clone()
        }
        fn hint_text(&self) -> Option<String> {
            None
        }
        fn description(&self) -> Option<String> {
            Some(String::new())
        }
        fn element_id(&self) -> Option<String> {
            self.id.clone()
        }
        fn package_name(&self) -> Option<String> {
            Some("com.example".into())
        }
        fn class_name(&self) -> Option<String> {
            Some("android.widget.TextView".into())
        }
        fn bounds(&self) -> Bounds {
            Bounds::new(0, 0, 100, 50)
        }
        fn is_clickable(&self) -> bool {
            self.clickable
        }
        fn is_editable(&self) -> bool {
            false
        }
        fn is_scrollable(&self) -> bool {
            false
        }
        fn child_count(&self) -> usize {
            self.children.len()
        }
        fn child(&self, index: usize) -> Option<Self> {
            if self.missing_child == Some(index) {
                return None;
            }
            self.children.get(index).cloned()
        }
    }

    #[test]
    fn test_capture_copies_fields_in_order() {
        let root = FakeNode {
            id: Some("root".into()),
            children: vec![
                FakeNode {
                    text: Some("Settings".into()),
                    clickable: true,
                    ..Default::default()
                },
                FakeNode {
                    text: Some("gone".into()),
                    ..Default::default()
                },
                FakeNode {
                    text: Some("Display".into()),
                    ..Default::default()
                },
            ],
            missing_child: Some(1),
            ..Default::default()
        };

        let tree = capture(&root);
        assert_eq!(tree.element_id.as_deref(), Some("root"));
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].text.as_deref(), Some("Settings"));
        assert!(tree.children[0].clickable);
        assert_eq!(tree.children[1].text.as_deref(), Some("Display"));
        // empty platform strings become None
        assert!(tree.description.is_none());
        assert_eq!(tree.package_name.as_deref(), Some("com.example"));
    }
}
