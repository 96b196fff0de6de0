//! Change-notifier glue
//!
//! Watches Services and Ingresses, keeps the reflector caches fresh, and
//! translates notifications into work-queue keys. Handlers never act on the
//! notification payload beyond extracting a key; the reconciler re-reads
//! state when the key is processed.

use std::sync::Arc;

use futures::{pin_mut, StreamExt};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::Api;
use kube::runtime::reflector;
use kube::runtime::reflector::store::Writer;
use kube::runtime::watcher::{watcher, Config as WatcherConfig, Event};
use kube::ResourceExt;
use tracing::{debug, info, trace, warn};

use crate::controller::ownership;
use crate::controller::queue::WorkQueue;
use crate::controller::reconciler::SourceKey;

/// Watch Services, enqueueing a key for every add or update.
///
/// Deletes enqueue nothing: the owner reference cascade removes the managed
/// Ingress without our help.
pub async fn run_service_watcher(
    api: Api<Service>,
    writer: Writer<Service>,
    config: WatcherConfig,
    queue: Arc<WorkQueue<SourceKey>>,
) {
    let stream = reflector(writer, watcher(api, config));
    pin_mut!(stream);

    info!("starting Service watcher");
    while let Some(event) = stream.next().await {
        match event {
            Ok(Event::Apply(service)) | Ok(Event::InitApply(service)) => {
                let key = SourceKey::from(&service);
                trace!(%key, "service changed");
                queue.add(key);
            }
            Ok(Event::Delete(service)) => {
                debug!(key = %SourceKey::from(&service), "service deleted, cascade cleans up");
            }
            Ok(Event::Init) => debug!("service watch (re)initializing"),
            Ok(Event::InitDone) => info!("service cache synced"),
            Err(e) => warn!(error = %e, "service watch error"),
        }
    }
    debug!("service watcher stopped");
}

/// Watch Ingresses, re-enqueueing the owning Service when a managed Ingress
/// is deleted out-of-band.
///
/// Deletions of Ingresses without our ownership marker are discarded.
pub async fn run_ingress_watcher(
    api: Api<Ingress>,
    writer: Writer<Ingress>,
    config: WatcherConfig,
    queue: Arc<WorkQueue<SourceKey>>,
) {
    let stream = reflector(writer, watcher(api, config));
    pin_mut!(stream);

    info!("starting Ingress watcher");
    while let Some(event) = stream.next().await {
        match event {
            Ok(Event::Delete(ingress)) => {
                let namespace = ingress.namespace().unwrap_or_default();
                let name = ingress.name_any();
                match ownership::owned_by(&ingress) {
                    Some(owner) => {
                        info!(
                            namespace = %namespace,
                            ingress = %name,
                            service = %owner,
                            "managed ingress deleted, re-enqueueing owner"
                        );
                        queue.add(SourceKey::new(namespace, owner));
                    }
                    None => {
                        debug!(
                            namespace = %namespace,
                            ingress = %name,
                            "ignoring deletion of unmanaged ingress"
                        );
                    }
                }
            }
            // Applies only refresh the cache; the Service side drives creation
            Ok(Event::Apply(_)) | Ok(Event::InitApply(_)) => {}
            Ok(Event::Init) => debug!("ingress watch (re)initializing"),
            Ok(Event::InitDone) => info!("ingress cache synced"),
            Err(e) => warn!(error = %e, "ingress watch error"),
        }
    }
    debug!("ingress watcher stopped");
}
