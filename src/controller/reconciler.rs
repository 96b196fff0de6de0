//! Reconciliation logic for annotated Services
//!
//! One pass per dequeued key: re-read the Service from cache, resolve the
//! desired Ingress, look up the current one, and issue at most one create or
//! delete to close the gap. Passes over an already-converged key make zero
//! store calls. The pass is level-triggered: it reacts to current cache
//! state, never to the notification that scheduled it, so missed or
//! duplicated notifications cannot corrupt the outcome.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::api::core::v1::Service;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::ownership;
use crate::resources::ingress::resolve;
use crate::store::{ClusterStore, CreateOutcome, DeleteOutcome};

/// Namespace/name key of a Service whose state must be re-examined.
///
/// Carries intent-to-look only; the reconciler re-reads the current state at
/// processing time, so a key scheduled by a stale notification is harmless.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub namespace: String,
    pub name: String,
}

impl SourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl From<&Service> for SourceKey {
    fn from(service: &Service) -> Self {
        Self {
            namespace: service.namespace().unwrap_or_default(),
            name: service.name_any(),
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Run one reconciliation pass for `key`.
#[instrument(skip(key, ctx), fields(namespace = %key.namespace, name = %key.name))]
pub async fn reconcile<S: ClusterStore>(key: &SourceKey, ctx: &Context<S>) -> Result<()> {
    let service_ref = ObjectRef::new(&key.name).within(&key.namespace);
    let Some(service) = ctx.services.get(&service_ref) else {
        // Service is gone; the owner reference cascade cleans up the Ingress
        debug!("service no longer exists, nothing to reconcile");
        return Ok(());
    };

    let desired = resolve(&service, &ctx.template)?;
    let current = ownership::lookup(&ctx.ingresses, &key.namespace, &key.name);

    match (desired, current) {
        (Some(ingress), None) => {
            let name = ingress.name_any();
            match ctx.store.create_ingress(&ingress).await? {
                CreateOutcome::Created => info!(ingress = %name, "created ingress"),
                CreateOutcome::AlreadyExists => {
                    // A concurrent pass or a stale cache got there first
                    debug!(ingress = %name, "ingress already exists, converged")
                }
            }
        }
        (Some(_), Some(current)) => {
            // Existing managed Ingresses are never spec-diffed
            debug!(ingress = %current.name_any(), "ingress up to date");
        }
        (None, Some(current)) => {
            let name = current.name_any();
            match ctx.store.delete_ingress(&key.namespace, &name).await? {
                DeleteOutcome::Deleted => info!(ingress = %name, "deleted ingress"),
                DeleteOutcome::NotFound => {
                    debug!(ingress = %name, "ingress already gone, converged")
                }
            }
        }
        (None, None) => {
            debug!("no ingress desired, none present");
        }
    }

    Ok(())
}

/// Worker loop: pull keys until shutdown, reconcile, and route failures back
/// through the rate limiter.
pub async fn run_worker<S: ClusterStore>(ctx: Arc<Context<S>>) {
    while let Some(key) = ctx.queue.get().await {
        let start = Instant::now();
        match reconcile(&key, &ctx).await {
            Ok(()) => {
                ctx.queue.forget(&key);
                if let Some(health) = &ctx.health {
                    health.metrics.record_reconcile(
                        &key.namespace,
                        &key.name,
                        start.elapsed().as_secs_f64(),
                    );
                }
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    key = %key,
                    error = %e,
                    retries = ctx.queue.num_requeues(&key),
                    "reconciliation failed, requeueing with backoff"
                );
                if let Some(health) = &ctx.health {
                    health
                        .metrics
                        .record_error(&key.namespace, &key.name, e.class());
                    health.metrics.record_retry();
                }
                ctx.queue.clone().add_rate_limited(key.clone());
            }
            Err(e) => {
                error!(key = %key, error = %e, "permanent reconciliation error, dropping key");
                if let Some(health) = &ctx.health {
                    health
                        .metrics
                        .record_error(&key.namespace, &key.name, e.class());
                }
                ctx.queue.forget(&key);
            }
        }
        ctx.queue.done(&key);
        if let Some(health) = &ctx.health {
            health.metrics.set_queue_depth(ctx.queue.len() as i64);
        }
    }
    debug!("worker stopped");
}
