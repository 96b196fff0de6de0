//! A level-triggered controller that exposes annotated Services through
//! managed Ingresses.
//!
//! Services opt in with the `ingress-operator.io/expose: "true"` annotation;
//! the controller creates an Ingress named `<service>-ingress` per annotated
//! Service, deletes it when the annotation goes away, and recreates it when
//! it is deleted out-of-band. Reconciliation always re-reads current cache
//! state, so missed or duplicated notifications converge to the same result.

pub mod config;
pub mod controller;
pub mod health;
pub mod resources;
pub mod store;

pub use config::Config;
pub use controller::{Context, Error, Result, SourceKey, WorkQueue, reconcile, run_worker};
pub use health::{HealthState, Metrics, run_health_server};
pub use resources::{EXPOSE_ANNOTATION, IngressTemplate, expose_requested, resolve};
pub use store::{ClusterStore, CreateOutcome, DeleteOutcome, KubeClusterStore};

use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client};

use crate::controller::watch;

/// Run the controller until `shutdown` completes.
///
/// Starts the Service and Ingress watchers, blocks until both caches have
/// seen a consistent snapshot, then runs `config.workers` reconcile workers
/// against the shared queue. On shutdown the queue drains, in-flight passes
/// finish, and the watchers stop.
///
/// A cache-sync failure is fatal: without an initial consistent view the
/// controller cannot safely decide desired state.
pub async fn run_controller(
    client: Client,
    config: Config,
    health: Option<Arc<HealthState>>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tracing::info!(
        workers = config.workers,
        host = %config.template.host,
        class = %config.template.ingress_class,
        "starting ingress controller"
    );

    let queue = Arc::new(WorkQueue::new(config.base_delay, config.max_delay));

    let (service_reader, service_writer) = reflector::store::<Service>();
    let (ingress_reader, ingress_writer) = reflector::store::<Ingress>();

    // any_semantic: bookmarks are fine, we re-read state per key anyway
    let watcher_config = WatcherConfig::default().any_semantic();

    let services: Api<Service> = Api::all(client.clone());
    let ingresses: Api<Ingress> = Api::all(client.clone());

    let service_watch = tokio::spawn(watch::run_service_watcher(
        services,
        service_writer,
        watcher_config.clone(),
        queue.clone(),
    ));
    let ingress_watch = tokio::spawn(watch::run_ingress_watcher(
        ingresses,
        ingress_writer,
        watcher_config,
        queue.clone(),
    ));

    tracing::info!("waiting for initial cache sync");
    service_reader
        .wait_until_ready()
        .await
        .map_err(|e| Error::InitialSyncError(e.to_string()))?;
    ingress_reader
        .wait_until_ready()
        .await
        .map_err(|e| Error::InitialSyncError(e.to_string()))?;
    tracing::info!("caches synced, starting {} workers", config.workers);

    if let Some(state) = &health {
        state.set_ready(true).await;
    }

    let ctx = Arc::new(Context {
        services: service_reader,
        ingresses: ingress_reader,
        store: KubeClusterStore::new(client),
        queue: queue.clone(),
        template: config.template.clone(),
        health: health.clone(),
    });

    let mut workers = Vec::with_capacity(config.workers);
    for _ in 0..config.workers {
        workers.push(tokio::spawn(run_worker(ctx.clone())));
    }

    shutdown.await;

    tracing::info!("shutdown requested, draining work queue");
    if let Some(state) = &health {
        state.set_ready(false).await;
    }
    queue.shut_down();
    service_watch.abort();
    ingress_watch.abort();
    for worker in workers {
        // Workers exit cleanly once the queue reports shutdown
        let _ = worker.await;
    }
    tracing::info!("controller stopped");

    Ok(())
}
