//! Core types for spacetree.
//!
//! This crate provides the item tree scanned by `spacetree-scan`: the node
//! model, the arena that owns it, the upward aggregation of subtree totals,
//! the scan policy, and read-only views for presentation layers.

mod aggregate;
mod config;
mod error;
mod node;
mod tree;
mod view;

pub use aggregate::Contribution;
pub use config::{ScanPolicy, ScanPolicyBuilder, ScanPolicyBuilderError};
pub use error::{ProbeError, ScanWarning, WarningKind};
pub use node::{
    Attributes, FILES_GROUP_NAME, FREE_SPACE_NAME, Node, NodeId, NodeKind, UNKNOWN_NAME,
    VolumeSpace, volume_display_name,
};
pub use tree::{Ancestors, ItemTree, Walk};
pub use view::{LayoutItem, NodeRef, Presentable};
