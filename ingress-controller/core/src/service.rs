use crate::{owned_metadata, ports::exposed_ports};
use ingress_controller_k8s_api::{GameServer, ObjectMeta, Service, ServicePort, ServiceSpec};
use std::collections::BTreeMap;

/// The label the game server operator sets on a GameServer's pod, naming the
/// GameServer.
///
/// Services built by [`make_service`] carry it too, and Kubernetes copies a
/// Service's labels onto its Endpoints.
pub const OWNER_LABEL: &str = "OwningGameServer";

/// Builds the Service fronting `gs`'s pod.
///
/// The Service shares the GameServer's name and namespace, selects its pod by
/// [`OWNER_LABEL`] and exposes the ports returned by [`exposed_ports`].
pub fn make_service(gs: &GameServer) -> Service {
    let ports = exposed_ports(gs)
        .into_iter()
        .map(ServicePort::from)
        .collect();
    let owner: BTreeMap<String, String> = [(
        OWNER_LABEL.to_string(),
        gs.metadata.name.clone().unwrap_or_default(),
    )]
    .into_iter()
    .collect();

    Service {
        metadata: ObjectMeta {
            labels: Some(owner.clone()),
            ..owned_metadata(gs)
        },
        spec: Some(ServiceSpec {
            selector: Some(owner),
            ports: Some(ports),
            ..Default::default()
        }),
        status: None,
    }
}
