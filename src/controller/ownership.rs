//! Ownership tracking for managed Ingresses
//!
//! A managed Ingress is attributable to its Service through the controller
//! owner reference written at creation time, plus the deterministic
//! `<service>-ingress` name. Lookup goes by derived name first (O(1) against
//! the cache) and falls back to an owner-reference scan of the namespace, so
//! an Ingress created under an older naming convention is still found. A
//! name-colliding Ingress without our owner reference is never treated as
//! managed.

use std::sync::Arc;

use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

/// Suffix appended to the Service name to derive the Ingress name
const NAME_SUFFIX: &str = "-ingress";

/// Deterministic name of the Ingress managed for `service_name`.
pub fn ingress_name_for(service_name: &str) -> String {
    format!("{}{}", service_name, NAME_SUFFIX)
}

/// Extract the owning Service's name from `ingress`, if this controller
/// manages it.
///
/// Only a controller owner reference of kind `Service` counts; anything else
/// (no references, references to other kinds, non-controller references)
/// means the Ingress is not ours.
pub fn owned_by(ingress: &Ingress) -> Option<String> {
    ingress
        .metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|owner| {
            owner.controller == Some(true) && owner.kind == "Service" && owner.api_version == "v1"
        })
        .map(|owner| owner.name.clone())
}

/// Find the Ingress managed for `(namespace, service_name)` in the cache.
///
/// Tries the derived name first; on a miss (or when the derived-name slot is
/// occupied by a foreign Ingress) scans the namespace by owner reference.
pub fn lookup(
    cache: &Store<Ingress>,
    namespace: &str,
    service_name: &str,
) -> Option<Arc<Ingress>> {
    let derived = ObjectRef::new(&ingress_name_for(service_name)).within(namespace);
    if let Some(ingress) = cache.get(&derived) {
        if owned_by(&ingress).as_deref() == Some(service_name) {
            return Some(ingress);
        }
    }
    find_owned(cache, namespace, service_name)
}

/// O(n) scan over the namespace's Ingresses matching the owner reference.
fn find_owned(
    cache: &Store<Ingress>,
    namespace: &str,
    service_name: &str,
) -> Option<Arc<Ingress>> {
    cache.state().into_iter().find(|ingress| {
        ingress.namespace().as_deref() == Some(namespace)
            && owned_by(ingress).as_deref() == Some(service_name)
    })
}
