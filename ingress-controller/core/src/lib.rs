#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Synthesizes the objects that expose a `GameServer` outside the cluster.
//!
//! Everything here is a pure function of its inputs: the same GameServer
//! (and configuration) always yields the same objects.

mod config;
pub mod ports;
pub mod route;
pub mod service;

pub use self::{
    config::{ConfigError, EntryPoints, RoutingConfig},
    ports::{exposed_ports, ExposedPort, Protocol},
    route::make_ingress_route,
    service::{make_service, OWNER_LABEL},
};

use ingress_controller_k8s_api::{GameServer, ObjectMeta, Resource, ResourceExt};

/// Builds metadata for an object derived from `gs`: same name and namespace,
/// controlled by the GameServer so that it is garbage collected with it.
fn owned_metadata(gs: &GameServer) -> ObjectMeta {
    ObjectMeta {
        name: Some(gs.name_any()),
        namespace: gs.namespace(),
        owner_references: gs.controller_owner_ref(&()).map(|owner| vec![owner]),
        ..Default::default()
    }
}
