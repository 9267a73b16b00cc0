use ingress_controller_k8s_api::{ContainerPort, GameServer, PortToExpose, ServicePort};
use std::{fmt, str::FromStr};

/// A container port selected for exposure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExposedPort {
    pub name: String,
    pub port: i32,
    pub protocol: Protocol,
}

/// Transport protocol of a container port.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown protocol: {0}")]
pub struct UnknownProtocol(String);

/// Resolves the GameServer's `portsToExpose` against its containers,
/// preserving the order of `portsToExpose`.
///
/// Entries that can't be exposed are skipped rather than failing the whole
/// GameServer: references to a container or port that doesn't exist, and
/// ports whose protocol can't be routed over HTTP.
pub fn exposed_ports(gs: &GameServer) -> Vec<ExposedPort> {
    gs.spec
        .ports_to_expose
        .iter()
        .filter_map(|pte| {
            let Some(port) = find_port(gs, pte) else {
                tracing::info!(
                    container = %pte.container_name,
                    port = %pte.port_name,
                    "Exposed port not found in GameServer template; skipping",
                );
                return None;
            };

            let protocol = match port.protocol.as_deref().map(str::parse::<Protocol>).transpose() {
                Ok(protocol) => protocol.unwrap_or(Protocol::Tcp),
                Err(error) => {
                    tracing::info!(port = %pte.port_name, %error, "Skipping port");
                    return None;
                }
            };
            if !protocol.is_routable() {
                tracing::info!(port = %pte.port_name, %protocol, "Only TCP ports are supported; skipping");
                return None;
            }

            Some(ExposedPort {
                name: pte.port_name.clone(),
                port: port.container_port,
                protocol,
            })
        })
        .collect()
}

fn find_port<'gs>(gs: &'gs GameServer, pte: &PortToExpose) -> Option<&'gs ContainerPort> {
    gs.spec
        .template
        .spec
        .as_ref()?
        .containers
        .iter()
        .filter(|c| c.name == pte.container_name)
        .flat_map(|c| c.ports.iter().flatten())
        .find(|p| p.name.as_deref() == Some(pte.port_name.as_str()))
}

// === impl ExposedPort ===

impl From<ExposedPort> for ServicePort {
    fn from(ExposedPort { name, port, protocol }: ExposedPort) -> Self {
        ServicePort {
            name: Some(name),
            port,
            protocol: Some(protocol.to_string()),
            ..Default::default()
        }
    }
}

// === impl Protocol ===

impl Protocol {
    /// Traefik's HTTP routers can only forward to stream-oriented backends.
    pub fn is_routable(&self) -> bool {
        matches!(self, Self::Tcp)
    }
}

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TCP" => Ok(Self::Tcp),
            "UDP" => Ok(Self::Udp),
            "SCTP" => Ok(Self::Sctp),
            _ => Err(UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("TCP"),
            Self::Udp => f.write_str("UDP"),
            Self::Sctp => f.write_str("SCTP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{mk_game_server, mk_port};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tcp(name: &str, port: i32) -> ExposedPort {
        ExposedPort {
            name: name.to_string(),
            port,
            protocol: Protocol::Tcp,
        }
    }

    #[test]
    fn drops_udp_ports() {
        let gs = mk_game_server(
            "default",
            "gs-1",
            [(
                "game",
                vec![
                    mk_port("game-port", 7777, Some("TCP")),
                    mk_port("udp-port", 7778, Some("UDP")),
                ],
            )],
            [("game", "game-port"), ("game", "udp-port")],
        );
        assert_eq!(exposed_ports(&gs), vec![tcp("game-port", 7777)]);
    }

    #[rstest]
    #[case::unknown_port([("game", "missing")])]
    #[case::unknown_container([("sidecar", "game-port")])]
    #[case::port_on_other_container([("game", "metrics")])]
    fn skips_dangling_references(#[case] expose: [(&'static str, &'static str); 1]) {
        let gs = mk_game_server(
            "default",
            "gs-1",
            [
                ("game", vec![mk_port("game-port", 7777, Some("TCP"))]),
                ("agent", vec![mk_port("metrics", 9090, Some("TCP"))]),
            ],
            expose.into_iter().chain([("game", "game-port")]),
        );
        assert_eq!(exposed_ports(&gs), vec![tcp("game-port", 7777)]);
    }

    #[rstest]
    #[case(None, true)]
    #[case(Some("TCP"), true)]
    #[case(Some("UDP"), false)]
    #[case(Some("SCTP"), false)]
    #[case(Some("QUIC"), false)]
    fn protocol_support(#[case] protocol: Option<&str>, #[case] exposed: bool) {
        let gs = mk_game_server(
            "default",
            "gs-1",
            [("game", vec![mk_port("game-port", 7777, protocol)])],
            [("game", "game-port")],
        );
        assert_eq!(!exposed_ports(&gs).is_empty(), exposed);
    }

    #[test]
    fn preserves_exposure_order() {
        let gs = mk_game_server(
            "default",
            "gs-1",
            [
                ("game", vec![mk_port("a", 7000, None), mk_port("b", 7001, None)]),
                ("admin", vec![mk_port("c", 8000, None)]),
            ],
            [("admin", "c"), ("game", "b"), ("game", "a")],
        );
        assert_eq!(
            exposed_ports(&gs),
            vec![tcp("c", 8000), tcp("b", 7001), tcp("a", 7000)]
        );
    }

    #[test]
    fn template_without_pod_spec() {
        let mut gs = mk_game_server(
            "default",
            "gs-1",
            [("game", vec![mk_port("game-port", 7777, None)])],
            [("game", "game-port")],
        );
        gs.spec.template.spec = None;
        assert!(exposed_ports(&gs).is_empty());
    }

    #[test]
    fn converts_to_service_port() {
        let port = ServicePort::from(tcp("game-port", 7777));
        assert_eq!(port.name.as_deref(), Some("game-port"));
        assert_eq!(port.port, 7777);
        assert_eq!(port.protocol.as_deref(), Some("TCP"));
        assert_eq!(port.target_port, None);
    }
}
