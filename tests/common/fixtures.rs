//! Builders for test Services and Ingresses, plus a recording store client

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use ingress_operator::controller::error::Error;
use ingress_operator::resources::{EXPOSE_ANNOTATION, IngressTemplate, resolve};
use ingress_operator::store::{ClusterStore, CreateOutcome, DeleteOutcome};

/// Build a Service in namespace `ns` with the given expose annotation value
/// (`None` for no annotation) declaring port 80.
pub fn service(name: &str, expose: Option<&str>) -> Service {
    service_with_port(name, expose, 80)
}

/// Build a Service declaring `port`.
pub fn service_with_port(name: &str, expose: Option<&str>, port: i32) -> Service {
    let annotations = expose.map(|value| {
        [(EXPOSE_ANNOTATION.to_string(), value.to_string())]
            .into_iter()
            .collect()
    });
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ns".to_string()),
            uid: Some(format!("uid-{name}")),
            annotations,
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The Ingress the controller would create for `service` — rendered through
/// the real resolver so cache contents match production shapes.
pub fn managed_ingress(service: &Service) -> Ingress {
    resolve(service, &IngressTemplate::default())
        .expect("fixture service resolves")
        .expect("fixture service is desired")
}

/// An Ingress with the derived name but no ownership marker.
pub fn foreign_ingress(name: &str) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ns".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A retryable API error (HTTP 503) for failure injection.
pub fn transient_error() -> Error {
    Error::KubeError(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: "injected".to_string(),
        reason: "ServiceUnavailable".to_string(),
        code: 503,
    }))
}

/// [`ClusterStore`] that records every call instead of talking to a cluster.
///
/// `fail_creates` injects that many transient failures before creates start
/// succeeding, for exercising the requeue path.
#[derive(Default)]
pub struct RecordingStore {
    pub creates: Mutex<Vec<Ingress>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub fail_creates: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_creates(failures: usize) -> Self {
        Self {
            fail_creates: AtomicUsize::new(failures),
            ..Default::default()
        }
    }

    pub fn create_count(&self) -> usize {
        self.creates.lock().unwrap().len()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.lock().unwrap().len()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.creates.lock().unwrap().iter().map(|i| i.name_any()).collect()
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn take_failure(&self) -> bool {
        self.fail_creates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl ClusterStore for RecordingStore {
    async fn create_ingress(&self, ingress: &Ingress) -> Result<CreateOutcome, Error> {
        if self.take_failure() {
            return Err(transient_error());
        }
        self.creates.lock().unwrap().push(ingress.clone());
        Ok(CreateOutcome::Created)
    }

    async fn delete_ingress(&self, namespace: &str, name: &str) -> Result<DeleteOutcome, Error> {
        self.deletes
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        Ok(DeleteOutcome::Deleted)
    }
}
