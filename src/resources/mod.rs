//! Kubernetes resource generation

pub mod common;
pub mod ingress;

pub use common::{owner_reference, standard_labels, FIELD_MANAGER};
pub use ingress::{
    expose_requested, resolve, IngressTemplate, EXPOSE_ANNOTATION,
};
