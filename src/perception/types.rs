use serde::{Deserialize, Serialize};

/// Screen rectangle in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// One node of an immutable screen snapshot.
///
/// Captured once per step and never mutated; the next step gets a new tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Platform resource identifier, e.g. `com.android.settings:id/search`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub scrollable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiNode>,
}

/// Child indices leading from the snapshot root to a node.
pub type NodePath = Vec<usize>;

/// A node resolved inside a snapshot, with the path platform glue uses to
/// find the matching live object.
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub node: &'a UiNode,
    pub path: NodePath,
}

impl UiNode {
    pub fn text_contains(&self, needle: &str) -> bool {
        contains_ignore_case(self.text.as_deref(), needle)
    }

    pub fn hint_contains(&self, needle: &str) -> bool {
        contains_ignore_case(self.hint_text.as_deref(), needle)
    }

    pub fn description_contains(&self, needle: &str) -> bool {
        contains_ignore_case(self.description.as_deref(), needle)
    }

    pub fn id_contains(&self, needle: &str) -> bool {
        contains_ignore_case(self.element_id.as_deref(), needle)
    }

    /// Node at `path`, or None when the path leaves the tree.
    pub fn at(&self, path: &[usize]) -> Option<&UiNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Depth-first, document-order search. Returns the first node accepted by
    /// `pred` together with its path.
    pub fn find_first<F>(&self, pred: F) -> Option<Located<'_>>
    where
        F: Fn(&UiNode) -> bool,
    {
        let mut path = Vec::new();
        find_in(self, &pred, &mut path).map(|node| Located { node, path })
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UiNode::node_count).sum::<usize>()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn find_in<'a, F>(node: &'a UiNode, pred: &F, path: &mut NodePath) -> Option<&'a UiNode>
where
    F: Fn(&UiNode) -> bool,
{
    if pred(node) {
        return Some(node);
    }
    for (index, child) in node.children.iter().enumerate() {
        path.push(index);
        if let Some(found) = find_in(child, pred, path) {
            return Some(found);
        }
        path.pop();
    }
    None
}

/// Case-insensitive substring test; an absent field never matches.
pub fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}
