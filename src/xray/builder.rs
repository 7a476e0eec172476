use std::time::Duration;

use futures::future::join_all;
use tokio::{sync::Mutex, time::timeout};
use tracing::Instrument;

use crate::abstract_factory::Factory;
use crate::file_format::config::XrayConfig;

use super::{
    interface::{RenderError, RendererRegistry, XrayObject},
    tree_node::TreeNode,
};

/// One object whose subtree could not be rendered.
#[derive(Debug)]
pub struct RenderFailure {
    /// Kind and name of the object, or its position in the input when it has
    /// no name.
    pub object: String,
    pub error: RenderError,
}

/// The outcome of a traversal: the tree plus whatever had to be skipped.
#[derive(Debug)]
pub struct XrayReport {
    pub tree: TreeNode,
    pub failures: Vec<RenderFailure>,
}

/// Drives a registry of renderers over a set of objects to build one tree.
///
/// Every object is rendered concurrently under the shared root.  A failure
/// (including running past the deadline) only costs that object its subtree;
/// siblings that already attached stay in the tree.
#[derive(Debug, Clone)]
pub struct XrayBuilder {
    registry: RendererRegistry,
    deadline: Option<Duration>,
}

impl Default for XrayBuilder {
    fn default() -> Self {
        XrayBuilder::new(RendererRegistry::with_defaults())
    }
}

impl XrayBuilder {
    pub fn new(registry: RendererRegistry) -> Self {
        XrayBuilder {
            registry,
            deadline: None,
        }
    }

    pub fn from_config(config: &XrayConfig) -> Self {
        let mut builder = XrayBuilder::default();
        builder.deadline = config.render_timeout();
        builder
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn registry_mut(&mut self) -> &mut RendererRegistry {
        &mut self.registry
    }

    pub async fn build(
        &self,
        factory: &(dyn Factory + Send + Sync),
        root: TreeNode,
        ns: &str,
        objects: &[XrayObject],
    ) -> XrayReport {
        let span = trace_span!("xray_build", root = %root.id, ns, objects = objects.len());

        let parent = Mutex::new(root);
        let renders = objects
            .iter()
            .map(|object| self.render_one(factory, &parent, ns, object));
        let results = join_all(renders).instrument(span).await;

        let mut failures = vec![];
        for (idx, (object, res)) in objects.iter().zip(results).enumerate() {
            if let Err(error) = res {
                let object = match object.name() {
                    "" => format!("{} #{}", object.kind(), idx),
                    name => format!("{} {}", object.kind(), name),
                };
                warn!(object = %object, err = %error, "Render failed");
                failures.push(RenderFailure { object, error });
            }
        }

        XrayReport {
            tree: parent.into_inner(),
            failures,
        }
    }

    async fn render_one(
        &self,
        factory: &(dyn Factory + Send + Sync),
        parent: &Mutex<TreeNode>,
        ns: &str,
        object: &XrayObject,
    ) -> Result<(), RenderError> {
        let kind = object.kind();
        let render = self.registry.render(kind, factory, parent, ns, object);
        match self.deadline {
            None => render.await,
            Some(deadline) => match timeout(deadline, render).await {
                Ok(res) => res,
                Err(_) => Err(RenderError::DeadlineExceeded {
                    kind,
                    id: object.name().to_string(),
                }),
            },
        }
    }
}
