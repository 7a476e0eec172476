use async_trait::async_trait;
use futures::future::join_all;
use k8s_openapi::api::core::v1 as core_v1;
use tokio::sync::Mutex;

use crate::abstract_factory::Factory;
use crate::kinds::{fqn, Kind};

use super::{
    container::{Container, RefName},
    interface::{attach, ContainerRes, RenderError, Renderer, Result, XrayObject},
    refs::add_ref,
    tree_node::{NodeStatus, TreeNode},
};

/// Renders a pod: its containers (through `Container`) plus the volumes,
/// service account and image pull secrets it references.
#[derive(Debug, Default)]
pub struct Pod;

#[async_trait]
impl Renderer for Pod {
    async fn render(
        &self,
        factory: &(dyn Factory + Send + Sync),
        parent: &Mutex<TreeNode>,
        ns: &str,
        object: &XrayObject,
    ) -> Result<()> {
        let pod = match object {
            XrayObject::Pod(pod) => pod,
            other => {
                return Err(RenderError::TypeMismatch {
                    expected: "Pod",
                    actual: other.type_name(),
                })
            }
        };

        let name = match pod.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(RenderError::InvalidObject {
                    kind: Kind::pods(),
                    message: "pod has no name".to_string(),
                })
            }
        };
        let pod_ns = pod.metadata.namespace.as_deref().unwrap_or(ns);

        let node = Mutex::new(TreeNode::new(Kind::pods(), fqn(pod_ns, name)));
        if let Some(spec) = &pod.spec {
            self.container_refs(factory, &node, pod_ns, spec).await?;
        }

        let mut node = node.into_inner();
        if let Some(spec) = &pod.spec {
            self.volume_refs(factory, &mut node, pod_ns, spec).await;
            self.account_refs(factory, &mut node, pod_ns, spec).await;
        }
        node.set_status(pod_status(pod));

        attach(parent, node).await
    }
}

impl Pod {
    async fn container_refs(
        &self,
        f: &(dyn Factory + Send + Sync),
        node: &Mutex<TreeNode>,
        ns: &str,
        spec: &core_v1::PodSpec,
    ) -> Result<()> {
        let containers: Vec<XrayObject> = spec
            .init_containers
            .iter()
            .flatten()
            .map(|co| XrayObject::from(ContainerRes::init(co.clone())))
            .chain(
                spec.containers
                    .iter()
                    .map(|co| XrayObject::from(ContainerRes::new(co.clone()))),
            )
            .collect();

        let renderer = Container;
        let renders = containers
            .iter()
            .map(|co| renderer.render(f, node, ns, co));
        for res in join_all(renders).await {
            res?;
        }
        Ok(())
    }

    async fn volume_refs(
        &self,
        f: &(dyn Factory + Send + Sync),
        node: &mut TreeNode,
        ns: &str,
        spec: &core_v1::PodSpec,
    ) {
        for v in spec.volumes.iter().flatten() {
            if let Some(sec) = &v.secret {
                if let Some(name) = sec.secret_name.as_deref().filter(|n| !n.is_empty()) {
                    add_ref(f, node, Kind::secrets(), fqn(ns, name), sec.optional).await;
                }
            }
            if let Some(cm) = &v.config_map {
                let name = cm.name.ref_name();
                if !name.is_empty() {
                    add_ref(f, node, Kind::config_maps(), fqn(ns, name), cm.optional).await;
                }
            }
            if let Some(pvc) = &v.persistent_volume_claim {
                if !pvc.claim_name.is_empty() {
                    let id = fqn(ns, &pvc.claim_name);
                    add_ref(f, node, Kind::persistent_volume_claims(), id, None).await;
                }
            }
        }
    }

    async fn account_refs(
        &self,
        f: &(dyn Factory + Send + Sync),
        node: &mut TreeNode,
        ns: &str,
        spec: &core_v1::PodSpec,
    ) {
        if let Some(sa) = spec.service_account_name.as_deref().filter(|n| !n.is_empty()) {
            add_ref(f, node, Kind::service_accounts(), fqn(ns, sa), None).await;
        }
        for pull in spec.image_pull_secrets.iter().flatten() {
            let name = pull.name.ref_name();
            if !name.is_empty() {
                add_ref(f, node, Kind::secrets(), fqn(ns, name), None).await;
            }
        }
    }
}

/// Overall pod health: completed pods are done, anything with an unready
/// container is toast.
fn pod_status(pod: &core_v1::Pod) -> NodeStatus {
    let status = match &pod.status {
        Some(status) => status,
        None => return NodeStatus::Toast,
    };
    if status.phase.as_deref() == Some("Succeeded") {
        return NodeStatus::Completed;
    }

    let statuses = status.container_statuses.as_deref().unwrap_or_default();
    let ready = statuses.iter().filter(|cs| cs.ready).count();
    if ready != statuses.len() {
        return NodeStatus::Toast;
    }
    NodeStatus::Ok
}
