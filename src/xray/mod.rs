//! Relationship trees ("xray") for cluster objects.
//!
//! A renderer per kind inspects an object, discovers the objects it points
//! at, resolves each against live state and hangs the results under a parent
//! node.  `XrayBuilder` is the driver tying renderers to a set of roots.

pub mod builder;
pub mod container;
pub mod interface;
pub mod pod;
pub mod refs;
pub mod tree_node;

pub use builder::{RenderFailure, XrayBuilder, XrayReport};
pub use container::Container;
pub use interface::{attach, ContainerRes, RenderError, Renderer, RendererRegistry, XrayObject};
pub use pod::Pod;
pub use refs::{add_ref, validate};
pub use tree_node::{NodeStatus, TreeNode, STATUS_KEY};
