#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod gameserver;
pub mod ingress_route;
mod resource_id;

pub use self::{
    gameserver::{GameServer, GameServerSpec, PortToExpose},
    ingress_route::{IngressRoute, IngressRouteSpec},
    resource_id::ResourceId,
};
pub use k8s_openapi::{
    api::{
        self,
        core::v1::{
            Container, ContainerPort, EndpointSubset, Endpoints, PodSpec, PodTemplateSpec,
            Service, ServicePort, ServiceSpec,
        },
    },
    apimachinery::pkg::{apis::meta::v1::OwnerReference, util::intstr::IntOrString},
    NamespaceResourceScope,
};
pub use kube::{
    api::{Api, ObjectMeta, PostParams, ResourceExt},
    Client, Error, Resource,
};
