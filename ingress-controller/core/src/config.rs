use ingress_controller_k8s_api::ingress_route::MiddlewareRef;

/// Process-wide routing settings applied to every IngressRoute.
///
/// Built once at startup and never changed afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingConfig {
    host: String,
    middleware: MiddlewareRef,
    entry_points: Vec<String>,
}

/// The Traefik entry points a route is attached to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryPoints {
    pub non_tls: Option<String>,
    pub tls: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("an externally visible host name must be configured")]
    MissingHost,

    #[error("a middleware name must be configured")]
    MissingMiddleware,

    #[error("at least one of the non-TLS and TLS entry points must be configured")]
    MissingEntryPoint,
}

// === impl RoutingConfig ===

impl RoutingConfig {
    /// Validates the routing settings. Empty values are treated as unset.
    pub fn new(
        host: impl Into<String>,
        middleware_name: impl Into<String>,
        middleware_namespace: Option<String>,
        entry_points: EntryPoints,
    ) -> Result<Self, ConfigError> {
        let host = non_empty(Some(host.into())).ok_or(ConfigError::MissingHost)?;
        let name = non_empty(Some(middleware_name.into())).ok_or(ConfigError::MissingMiddleware)?;
        let entry_points = entry_points.into_vec();
        if entry_points.is_empty() {
            return Err(ConfigError::MissingEntryPoint);
        }

        Ok(Self {
            host,
            middleware: MiddlewareRef {
                name,
                namespace: non_empty(middleware_namespace),
            },
            entry_points,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn middleware(&self) -> &MiddlewareRef {
        &self.middleware
    }

    /// Entry point names, non-TLS first.
    pub fn entry_points(&self) -> &[String] {
        &self.entry_points
    }
}

// === impl EntryPoints ===

impl EntryPoints {
    fn into_vec(self) -> Vec<String> {
        non_empty(self.non_tls)
            .into_iter()
            .chain(non_empty(self.tls))
            .collect()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_points(non_tls: Option<&str>, tls: Option<&str>) -> EntryPoints {
        EntryPoints {
            non_tls: non_tls.map(Into::into),
            tls: tls.map(Into::into),
        }
    }

    #[test]
    fn orders_entry_points() {
        let config = RoutingConfig::new(
            "games.example.com",
            "strip-prefix",
            Some("traefik".to_string()),
            entry_points(Some("web"), Some("websecure")),
        )
        .unwrap();
        assert_eq!(config.entry_points(), ["web", "websecure"]);
        assert_eq!(config.host(), "games.example.com");
        assert_eq!(config.middleware().namespace.as_deref(), Some("traefik"));

        let config = RoutingConfig::new(
            "games.example.com",
            "strip-prefix",
            None,
            entry_points(None, Some("websecure")),
        )
        .unwrap();
        assert_eq!(config.entry_points(), ["websecure"]);
    }

    #[test]
    fn requires_an_entry_point() {
        for eps in [
            entry_points(None, None),
            entry_points(Some(""), None),
            entry_points(Some(" "), Some("")),
        ] {
            assert_eq!(
                RoutingConfig::new("games.example.com", "mw", None, eps),
                Err(ConfigError::MissingEntryPoint)
            );
        }
    }

    #[test]
    fn requires_host_and_middleware() {
        assert_eq!(
            RoutingConfig::new("", "mw", None, entry_points(Some("web"), None)),
            Err(ConfigError::MissingHost)
        );
        assert_eq!(
            RoutingConfig::new("games.example.com", "", None, entry_points(Some("web"), None)),
            Err(ConfigError::MissingMiddleware)
        );
    }

    #[test]
    fn empty_middleware_namespace_is_unset() {
        let config = RoutingConfig::new(
            "games.example.com",
            "mw",
            Some(String::new()),
            entry_points(Some("web"), None),
        )
        .unwrap();
        assert_eq!(config.middleware().namespace, None);
    }
}
