//! The Traefik `IngressRoute` resource.
//!
//! Field names and casing are the contract the routing layer reads, so they
//! must not drift.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "traefik.containo.us",
    version = "v1alpha1",
    kind = "IngressRoute",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct IngressRouteSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_points: Vec<String>,
    pub routes: Vec<Route>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub kind: RouteKind,

    /// A rule expression, e.g. ``Host(`example.com`) && PathPrefix(`/gs`)``.
    #[serde(rename = "match")]
    pub match_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub middlewares: Vec<MiddlewareRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<RouteService>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum RouteKind {
    Rule,
}

/// References a `Middleware` resource.
///
/// When `namespace` is unset the middleware is resolved in the route's own
/// namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
pub struct MiddlewareRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// A Kubernetes Service backend, addressed by port number or name.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RouteService {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<IntOrString>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_traefik_schema() {
        let route = IngressRoute::new(
            "gs-1",
            IngressRouteSpec {
                entry_points: vec!["web".to_string(), "websecure".to_string()],
                routes: vec![Route {
                    kind: RouteKind::Rule,
                    match_: "Host(`games.example.com`) && PathPrefix(`/gs-1`)".to_string(),
                    priority: None,
                    middlewares: vec![MiddlewareRef {
                        name: "strip-prefix".to_string(),
                        namespace: Some("traefik".to_string()),
                    }],
                    services: vec![RouteService {
                        name: "gs-1".to_string(),
                        namespace: None,
                        port: Some(IntOrString::Int(7777)),
                    }],
                }],
            },
        );

        assert_eq!(
            serde_json::to_value(&route).unwrap(),
            serde_json::json!({
                "apiVersion": "traefik.containo.us/v1alpha1",
                "kind": "IngressRoute",
                "metadata": { "name": "gs-1" },
                "spec": {
                    "entryPoints": ["web", "websecure"],
                    "routes": [{
                        "kind": "Rule",
                        "match": "Host(`games.example.com`) && PathPrefix(`/gs-1`)",
                        "middlewares": [{ "name": "strip-prefix", "namespace": "traefik" }],
                        "services": [{ "name": "gs-1", "port": 7777 }],
                    }],
                },
            })
        );
    }

    #[test]
    fn reads_named_service_ports() {
        let spec: IngressRouteSpec = serde_json::from_value(serde_json::json!({
            "routes": [{
                "kind": "Rule",
                "match": "PathPrefix(`/`)",
                "services": [{ "name": "web", "port": "http" }],
            }],
        }))
        .unwrap();
        assert!(spec.entry_points.is_empty());
        assert_eq!(
            spec.routes[0].services[0].port,
            Some(IntOrString::String("http".to_string()))
        );
    }
}
