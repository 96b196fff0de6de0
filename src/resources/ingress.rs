//! Desired-state resolution for managed Ingresses
//!
//! [`resolve`] is the pure decision function of the controller: given a
//! Service's current annotations it either renders the Ingress that should
//! exist or decides that none should. It never looks at live cluster state;
//! comparing desired against current is the reconciler's job.

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use kube::core::ObjectMeta;
use kube::ResourceExt;

use crate::controller::error::{Error, Result};
use crate::controller::ownership;
use crate::resources::common::{owner_reference, standard_labels};

/// Annotation that opts a Service into a managed Ingress.
///
/// Only the exact string `"true"` counts; anything else (including `"True"`
/// or `"1"`) means not desired.
pub const EXPOSE_ANNOTATION: &str = "ingress-operator.io/expose";

/// Shape of the Ingresses this controller creates.
///
/// Every managed Ingress has exactly one rule for `host` with exactly one
/// HTTP path backending the Service; only the listed fields vary.
#[derive(Clone, Debug)]
pub struct IngressTemplate {
    /// Host the single rule matches
    pub host: String,
    /// `spec.ingressClassName` of generated Ingresses
    pub ingress_class: String,
    /// Path of the single HTTP rule, `Prefix`-matched
    pub path: String,
    /// Backend port when the Service declares no ports
    pub default_backend_port: i32,
}

impl Default for IngressTemplate {
    fn default() -> Self {
        Self {
            host: "ingress.example.com".to_string(),
            ingress_class: "nginx".to_string(),
            path: "/".to_string(),
            default_backend_port: 80,
        }
    }
}

impl IngressTemplate {
    /// Reject templates that would render an Ingress the API server cannot
    /// accept. Surfaced as a permanent error, never requeued.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() || self.host.contains(char::is_whitespace) {
            return Err(Error::InvalidTemplate(format!(
                "host {:?} is not a valid DNS name",
                self.host
            )));
        }
        if !self.path.starts_with('/') {
            return Err(Error::InvalidTemplate(format!(
                "path {:?} must be absolute",
                self.path
            )));
        }
        if self.ingress_class.is_empty() {
            return Err(Error::InvalidTemplate("ingress class is empty".to_string()));
        }
        Ok(())
    }
}

/// Check whether `service` has opted into a managed Ingress.
pub fn expose_requested(service: &Service) -> bool {
    service
        .annotations()
        .get(EXPOSE_ANNOTATION)
        .is_some_and(|value| value == "true")
}

/// Compute the desired state for `service`.
///
/// `Ok(None)` means no Ingress should exist. `Ok(Some(_))` carries the full
/// Ingress to create: one rule, one `Prefix` path, backending the Service on
/// its first declared port (or the template default when it declares none).
pub fn resolve(service: &Service, template: &IngressTemplate) -> Result<Option<Ingress>> {
    if !expose_requested(service) {
        return Ok(None);
    }
    template.validate()?;

    let service_name = service.name_any();
    let backend_port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|port| port.port)
        .unwrap_or(template.default_backend_port);

    let ingress = Ingress {
        metadata: ObjectMeta {
            name: Some(ownership::ingress_name_for(&service_name)),
            namespace: service.namespace(),
            labels: Some(standard_labels(&service_name)),
            owner_references: Some(vec![owner_reference(service)?]),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some(template.ingress_class.clone()),
            rules: Some(vec![IngressRule {
                host: Some(template.host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(template.path.clone()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name,
                                port: Some(ServiceBackendPort {
                                    number: Some(backend_port),
                                    name: None,
                                }),
                            }),
                            resource: None,
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        status: None,
    };

    Ok(Some(ingress))
}
