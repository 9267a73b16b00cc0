use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single game server instance, managed by the game server operator.
///
/// Only the fields needed to expose the server are modelled; everything else
/// in the upstream schema is ignored when reading.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "mps.playfab.com",
    version = "v1alpha1",
    kind = "GameServer",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GameServerSpec {
    /// The pod template the game server runs.
    pub template: PodTemplateSpec,

    /// Container ports that should be reachable from outside the cluster.
    #[serde(default)]
    pub ports_to_expose: Vec<PortToExpose>,

    #[serde(rename = "buildID", default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,

    #[serde(rename = "titleID", default, skip_serializing_if = "Option::is_none")]
    pub title_id: Option<String>,
}

/// References a named port on one of the template's containers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortToExpose {
    pub container_name: String,
    pub port_name: String,
}
