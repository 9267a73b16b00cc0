use crate::{owned_metadata, RoutingConfig};
use ingress_controller_k8s_api::{
    ingress_route::{Route, RouteKind, RouteService},
    GameServer, IngressRoute, IngressRouteSpec, IntOrString, ResourceExt, Service,
};

/// Builds the IngressRoute that exposes `gs` through `service`.
///
/// Requests for `<host>/<game server name>` are routed to every port of the
/// Service as it exists in the cluster, so the Service must be created
/// first.
pub fn make_ingress_route(
    gs: &GameServer,
    service: &Service,
    config: &RoutingConfig,
) -> IngressRoute {
    let name = gs.name_any();
    let services = service
        .spec
        .iter()
        .flat_map(|spec| spec.ports.iter().flatten())
        .map(|port| RouteService {
            name: service.name_any(),
            namespace: None,
            port: Some(IntOrString::Int(port.port)),
        })
        .collect();

    IngressRoute {
        metadata: owned_metadata(gs),
        spec: IngressRouteSpec {
            entry_points: config.entry_points().to_vec(),
            routes: vec![Route {
                kind: RouteKind::Rule,
                match_: format!("Host(`{}`) && PathPrefix(`/{}`)", config.host(), name),
                priority: None,
                middlewares: vec![config.middleware().clone()],
                services,
            }],
        },
    }
}
