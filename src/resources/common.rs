//! Common utilities for Kubernetes resource generation
//!
//! Shared labels and the owner reference that ties a managed Ingress back to
//! its Service. The owner reference is the single ownership encoding in this
//! controller; everything that decides "is this ours" reads it back.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;

use crate::controller::error::{Error, Result};

/// Operator name used for the managed-by label
pub const FIELD_MANAGER: &str = "ingress-operator";

/// Generate a controller owner reference pointing at `service`.
///
/// Kubernetes garbage-collects the Ingress when the Service is deleted, so
/// source-resource deletion needs no explicit cleanup here.
pub fn owner_reference(service: &Service) -> Result<OwnerReference> {
    let uid = service
        .uid()
        .ok_or(Error::MissingObjectKey("metadata.uid"))?;
    Ok(OwnerReference {
        api_version: "v1".to_string(),
        kind: "Service".to_string(),
        name: service.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Standard labels for resources managed on behalf of `service_name`
pub fn standard_labels(service_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            service_name.to_string(),
        ),
        (
            "app.kubernetes.io/component".to_string(),
            "ingress".to_string(),
        ),
        (
            "app.kubernetes.io/managed-by".to_string(),
            FIELD_MANAGER.to_string(),
        ),
    ])
}
