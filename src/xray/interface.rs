use std::{collections::HashMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::api::core::v1 as core_v1;
use tokio::sync::Mutex;

pub use crate::abstract_factory::Factory;
use crate::kinds::Kind;

use super::{container::Container, pod::Pod, tree_node::TreeNode};

/// A container as it is handed to the container renderer: its definition plus
/// where it came from in its pod.
#[derive(Clone, Debug)]
pub struct ContainerRes {
    pub container: core_v1::Container,
    pub is_init: bool,
}

impl ContainerRes {
    pub fn new(container: core_v1::Container) -> Self {
        ContainerRes {
            container,
            is_init: false,
        }
    }

    pub fn init(container: core_v1::Container) -> Self {
        ContainerRes {
            container,
            is_init: true,
        }
    }
}

/// The typed objects the tree builder knows how to render.
#[derive(Clone, Debug)]
pub enum XrayObject {
    Pod(Box<core_v1::Pod>),
    Container(ContainerRes),
}

impl XrayObject {
    pub fn kind(&self) -> Kind {
        match self {
            XrayObject::Pod(_) => Kind::pods(),
            XrayObject::Container(_) => Kind::containers(),
        }
    }

    /// The object's own name, empty when it has none.
    pub fn name(&self) -> &str {
        match self {
            XrayObject::Pod(pod) => pod.metadata.name.as_deref().unwrap_or_default(),
            XrayObject::Container(co) => &co.container.name,
        }
    }

    /// Name of the payload type, for mismatch reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            XrayObject::Pod(_) => "Pod",
            XrayObject::Container(_) => "ContainerRes",
        }
    }
}

impl From<core_v1::Pod> for XrayObject {
    fn from(pod: core_v1::Pod) -> Self {
        XrayObject::Pod(Box::new(pod))
    }
}

impl From<ContainerRes> for XrayObject {
    fn from(co: ContainerRes) -> Self {
        XrayObject::Container(co)
    }
}

/// Failures that abort the rendering of one object's subtree.
///
/// Dangling references are deliberately absent: those are recorded on the
/// tree as node status instead.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("expected {expected}, but got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("{kind} {id} is already attached to {parent}")]
    DuplicateNode {
        kind: Kind,
        id: String,
        parent: String,
    },
    #[error("no renderer registered for {0}")]
    NoRenderer(Kind),
    #[error("invalid {kind} object: {message}")]
    InvalidObject { kind: Kind, message: String },
    #[error("deadline exceeded while rendering {kind} {id}")]
    DeadlineExceeded { kind: Kind, id: String },
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Kind specific discovery of an object's relationships.
///
/// A renderer builds the node for `object` along with everything it
/// references and then attaches that subtree to `parent`.  The parent is only
/// locked for the final attach; factory lookups happen before that.
#[async_trait]
pub trait Renderer: Debug {
    async fn render(
        &self,
        factory: &(dyn Factory + Send + Sync),
        parent: &Mutex<TreeNode>,
        ns: &str,
        object: &XrayObject,
    ) -> Result<()>;
}

/// Attach a fully built node under `parent`, refusing a second node with
/// the same identity.
pub async fn attach(parent: &Mutex<TreeNode>, node: TreeNode) -> Result<()> {
    let mut parent = parent.lock().await;
    if parent.find(node.kind, &node.id).is_some() {
        return Err(RenderError::DuplicateNode {
            kind: node.kind,
            id: node.id,
            parent: parent.id.clone(),
        });
    }
    parent.add(node);
    Ok(())
}

/// Maps a kind to the renderer responsible for it.  New kinds register here
/// without the dispatcher knowing about them.
#[derive(Debug, Default, Clone)]
pub struct RendererRegistry {
    renderers: HashMap<Kind, Arc<dyn Renderer + Send + Sync>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        RendererRegistry::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = RendererRegistry::new();
        registry.register(Kind::pods(), Arc::new(Pod));
        registry.register(Kind::containers(), Arc::new(Container));
        registry
    }

    /// Register a renderer, replacing any previous one for the kind.
    pub fn register(&mut self, kind: Kind, renderer: Arc<dyn Renderer + Send + Sync>) {
        self.renderers.insert(kind, renderer);
    }

    pub fn get(&self, kind: Kind) -> Option<&Arc<dyn Renderer + Send + Sync>> {
        self.renderers.get(&kind)
    }

    /// Dispatch `object` to the renderer registered for `kind`.
    pub async fn render(
        &self,
        kind: Kind,
        factory: &(dyn Factory + Send + Sync),
        parent: &Mutex<TreeNode>,
        ns: &str,
        object: &XrayObject,
    ) -> Result<()> {
        let renderer = self.get(kind).ok_or(RenderError::NoRenderer(kind))?;
        trace!(kind = %kind, renderer = ?renderer, "dispatching");
        renderer.render(factory, parent, ns, object).await
    }
}
