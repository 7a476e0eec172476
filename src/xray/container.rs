use async_trait::async_trait;
use k8s_openapi::api::core::v1 as core_v1;
use tokio::sync::Mutex;

use crate::abstract_factory::Factory;
use crate::kinds::{fqn, namespaced, Kind};

use super::{
    interface::{attach, RenderError, Renderer, Result, XrayObject},
    refs::add_ref,
    tree_node::TreeNode,
};

/// Selector `name` fields are optional in older API versions and required in
/// newer ones; read them the same way either way.
pub(super) trait RefName {
    fn ref_name(&self) -> &str;
}

impl RefName for String {
    fn ref_name(&self) -> &str {
        self
    }
}

impl RefName for Option<String> {
    fn ref_name(&self) -> &str {
        self.as_deref().unwrap_or_default()
    }
}

/// Renders a container and the secrets and config maps its environment
/// pulls from.
#[derive(Debug, Default)]
pub struct Container;

#[async_trait]
impl Renderer for Container {
    async fn render(
        &self,
        factory: &(dyn Factory + Send + Sync),
        parent: &Mutex<TreeNode>,
        ns: &str,
        object: &XrayObject,
    ) -> Result<()> {
        let co = match object {
            XrayObject::Container(co) => co,
            other => {
                return Err(RenderError::TypeMismatch {
                    expected: "ContainerRes",
                    actual: other.type_name(),
                })
            }
        };

        let mut root = TreeNode::new(Kind::containers(), fqn(ns, &co.container.name));
        // References resolve in the owner's namespace, whatever `ns` says.
        let pns = {
            let parent = parent.lock().await;
            namespaced(&parent.id).0.to_string()
        };
        self.env_refs(factory, &mut root, &pns, &co.container).await;

        attach(parent, root).await
    }
}

impl Container {
    async fn env_refs(
        &self,
        f: &(dyn Factory + Send + Sync),
        parent: &mut TreeNode,
        ns: &str,
        co: &core_v1::Container,
    ) {
        for e in co.env.iter().flatten() {
            let source = match &e.value_from {
                Some(source) => source,
                None => continue,
            };
            if let Some(sel) = &source.secret_key_ref {
                self.secret_ref(f, parent, ns, sel).await;
            }
            if let Some(sel) = &source.config_map_key_ref {
                self.config_map_ref(f, parent, ns, sel).await;
            }
        }

        for e in co.env_from.iter().flatten() {
            if let Some(cm) = &e.config_map_ref {
                let name = cm.name.ref_name();
                if !name.is_empty() {
                    add_ref(f, parent, Kind::config_maps(), fqn(ns, name), cm.optional).await;
                }
            }
            if let Some(sec) = &e.secret_ref {
                let name = sec.name.ref_name();
                if !name.is_empty() {
                    add_ref(f, parent, Kind::secrets(), fqn(ns, name), sec.optional).await;
                }
            }
        }
    }

    async fn secret_ref(
        &self,
        f: &(dyn Factory + Send + Sync),
        parent: &mut TreeNode,
        ns: &str,
        sel: &core_v1::SecretKeySelector,
    ) {
        let name = sel.name.ref_name();
        if name.is_empty() {
            return;
        }
        add_ref(f, parent, Kind::secrets(), fqn(ns, name), sel.optional).await;
    }

    async fn config_map_ref(
        &self,
        f: &(dyn Factory + Send + Sync),
        parent: &mut TreeNode,
        ns: &str,
        sel: &core_v1::ConfigMapKeySelector,
    ) {
        let name = sel.name.ref_name();
        if name.is_empty() {
            return;
        }
        add_ref(f, parent, Kind::config_maps(), fqn(ns, name), sel.optional).await;
    }
}
