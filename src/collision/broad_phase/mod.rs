mod dynamic_tree;
mod pair_manager;

pub use dynamic_tree::{DynamicTree, ProxyId};
pub use pair_manager::BroadPhase;
