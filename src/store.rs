//! Cluster state store client
//!
//! [`ClusterStore`] is the seam between the reconciler and the Kubernetes
//! API server's mutating endpoints. The benign races of a level-triggered
//! controller are folded into the outcome types here: a create that loses to
//! a concurrent creator reports [`CreateOutcome::AlreadyExists`] and a delete
//! that races an external deletion reports [`DeleteOutcome::NotFound`], both
//! of which the reconciler treats as convergence rather than failure.

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};

/// Outcome of a create call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The resource already existed; the desired state holds
    AlreadyExists,
}

/// Outcome of a delete call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The resource was already gone; the desired state holds
    NotFound,
}

/// Trait abstracting the store's mutating calls for managed Ingresses.
///
/// This allows mocking the API client in tests while using the real client
/// in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Create `ingress` in its namespace.
    async fn create_ingress(&self, ingress: &Ingress) -> Result<CreateOutcome>;

    /// Delete the named Ingress.
    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<DeleteOutcome>;
}

/// Real [`ClusterStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeClusterStore {
    client: Client,
}

impl KubeClusterStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterStore for KubeClusterStore {
    async fn create_ingress(&self, ingress: &Ingress) -> Result<CreateOutcome> {
        let namespace = ingress
            .namespace()
            .ok_or(Error::MissingObjectKey("metadata.namespace"))?;
        match self
            .api(&namespace)
            .create(&PostParams::default(), ingress)
            .await
        {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(e)) if e.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<DeleteOutcome> {
        match self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
