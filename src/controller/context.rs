//! Shared context for the controller
//!
//! Collaborators are injected here rather than captured in handler closures,
//! so the reconciler and workers depend only on what the constructor hands
//! them.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector::Store;

use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::SourceKey;
use crate::health::HealthState;
use crate::resources::IngressTemplate;

/// Shared state handed to every worker.
///
/// `S` is the mutating store client; tests substitute a recording or mock
/// implementation.
pub struct Context<S> {
    /// Read-through cache of Services, fed by the watch subsystem
    pub services: Store<Service>,
    /// Read-through cache of Ingresses, fed by the watch subsystem
    pub ingresses: Store<Ingress>,
    /// Mutating client for the cluster state store
    pub store: S,
    /// Work queue shared with the notification handlers
    pub queue: Arc<WorkQueue<SourceKey>>,
    /// Shape of the Ingresses to create
    pub template: IngressTemplate,
    /// Health/metrics state; `None` disables metric recording
    pub health: Option<Arc<HealthState>>,
}
