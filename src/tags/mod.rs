pub mod hierarchy;
pub mod model;
pub mod panel;
pub mod tree;

pub use hierarchy::{build_hierarchy, HierarchyError};
pub use model::{count_nodes, Forest, TagId, TagNode, TagRecord};
pub use panel::{CloseReason, FailureCategory, LoadTicket, PanelFailure, PanelState, TagPanel};
pub use tree::{
    Affordance, Expansion, NodeKey, OutlineRenderer, TagTree, TreeRenderer, TreeRow,
    AFFORDANCE_WIDTH_PX, INDENT_PER_LEVEL_PX,
};
