pub mod fixture;
pub mod traits;
pub mod types;
pub mod ui_tree;

pub use fixture::FixtureScreen;
pub use traits::{NoActiveWindow, PlatformNode, ScreenSource};
pub use types::{Bounds, Located, NodePath, UiNode};
