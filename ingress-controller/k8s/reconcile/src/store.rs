use ingress_controller_k8s_api::{Endpoints, GameServer, IngressRoute, ResourceId, Service};
use std::{fmt, time::Duration};

/// Reads and creates the objects the reconciler works with.
///
/// Reads return `Ok(None)` when the object doesn't exist. Creates are atomic
/// create-if-absent operations: when the object already exists the store
/// reports it instead of failing, and never modifies the existing object.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_game_server(&self, id: &ResourceId) -> Result<Option<GameServer>, StoreError>;

    async fn get_service(&self, id: &ResourceId) -> Result<Option<Service>, StoreError>;

    async fn get_endpoints(&self, id: &ResourceId) -> Result<Option<Endpoints>, StoreError>;

    async fn get_ingress_route(&self, id: &ResourceId)
        -> Result<Option<IngressRoute>, StoreError>;

    async fn create_service(&self, service: &Service) -> Result<Created, StoreError>;

    async fn create_ingress_route(&self, route: &IngressRoute) -> Result<Created, StoreError>;
}

/// The result of a create-if-absent operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Created {
    Created,
    /// An object with the same name already existed.
    AlreadyExists,
    /// The write lost a race with a concurrent writer.
    Conflict,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("object has no namespace")]
    MissingNamespace,
}

/// The kinds of objects the reconciler reads or writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    GameServer,
    Service,
    Endpoints,
    IngressRoute,
}

// === impl Created ===

impl Created {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyExists => "already_exists",
            Self::Conflict => "conflict",
        }
    }
}

// === impl Kind ===

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GameServer => "GameServer",
            Self::Service => "Service",
            Self::Endpoints => "Endpoints",
            Self::IngressRoute => "IngressRoute",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
