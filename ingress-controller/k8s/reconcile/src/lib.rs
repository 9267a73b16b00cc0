#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Converges the objects that expose a `GameServer`.
//!
//! Each call to [`Reconciler::reconcile`] reads the current state of a
//! GameServer's dependents, takes at most one step toward the converged state
//! and tells the caller whether to come back later. No state is kept between
//! calls, so a call may be repeated, reordered or run concurrently with
//! another for the same GameServer.

mod kube_store;
mod metrics;
mod store;


pub use self::{
    kube_store::KubeStore,
    metrics::Metrics,
    store::{Created, Kind, ResourceStore, StoreError},
};
use ingress_controller_core::{make_ingress_route, make_service, RoutingConfig};
use ingress_controller_k8s_api::{Endpoints, GameServer, ResourceId, Service};
use std::{future::Future, time::Duration};
use tracing::{debug, field, info, instrument, warn, Span};

/// How long to wait for a Service's endpoints to become ready before checking
/// again.
pub const READINESS_REQUEUE: Duration = Duration::from_secs(1);

/// What the caller should do after a reconciliation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing further to do until something changes.
    Done,
    /// Reconcile again once the duration has elapsed.
    RequeueAfter(Duration),
}

/// The observed state of a GameServer's dependents.
#[derive(Clone, Debug, PartialEq)]
pub enum State {
    /// The GameServer no longer exists.
    WorkloadMissing,
    NoService(GameServer),
    /// The Service exists but no pod behind it is ready.
    AwaitingEndpoints,
    NoRoute {
        game_server: GameServer,
        service: Service,
    },
    Converged,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to get {kind} {id}")]
    Get {
        kind: Kind,
        id: ResourceId,
        #[source]
        source: StoreError,
    },

    #[error("failed to create {kind} {id}")]
    Create {
        kind: Kind,
        id: ResourceId,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug)]
pub struct Reconciler<S> {
    store: S,
    config: RoutingConfig,
    metrics: Metrics,
}

// === impl Reconciler ===

impl<S: ResourceStore> Reconciler<S> {
    pub fn new(store: S, config: RoutingConfig, metrics: Metrics) -> Self {
        Self {
            store,
            config,
            metrics,
        }
    }

    /// Takes the next step toward exposing the GameServer identified by `id`.
    #[instrument(
        skip_all,
        fields(
            ns = %id.namespace,
            name = %id.name,
            build_id = field::Empty,
            title_id = field::Empty,
        )
    )]
    pub async fn reconcile(&self, id: &ResourceId) -> Result<Outcome, Error> {
        let state = self.observe(id).await?;
        self.metrics.observed(state.as_str());
        debug!(state = state.as_str(), "Observed");

        match state {
            State::WorkloadMissing => {
                debug!("GameServer not found");
                Ok(Outcome::Done)
            }

            State::NoService(gs) => {
                let service = make_service(&gs);
                let ports = service.spec.as_ref().and_then(|s| s.ports.as_ref());
                if ports.map_or(true, Vec::is_empty) {
                    // An update to the GameServer re-triggers reconciliation.
                    warn!(
                        ports_to_expose = gs.spec.ports_to_expose.len(),
                        "GameServer exposes no routable ports"
                    );
                    return Ok(Outcome::Done);
                }
                self.create(Kind::Service, id, self.store.create_service(&service))
                    .await?;
                // The Service was just created, so its endpoints can't be
                // ready yet.
                Ok(Outcome::RequeueAfter(READINESS_REQUEUE))
            }

            State::AwaitingEndpoints => {
                debug!("Waiting for Service endpoints");
                Ok(Outcome::RequeueAfter(READINESS_REQUEUE))
            }

            State::NoRoute {
                game_server,
                service,
            } => {
                let route = make_ingress_route(&game_server, &service, &self.config);
                self.create(Kind::IngressRoute, id, self.store.create_ingress_route(&route))
                    .await?;
                Ok(Outcome::Done)
            }

            State::Converged => Ok(Outcome::Done),
        }
    }

    /// Reads the GameServer's dependents to determine its current state.
    ///
    /// Dependents are read in creation order and reading stops at the first
    /// missing one.
    pub async fn observe(&self, id: &ResourceId) -> Result<State, Error> {
        let Some(game_server) = self
            .get(Kind::GameServer, id, self.store.get_game_server(id))
            .await?
        else {
            return Ok(State::WorkloadMissing);
        };
        record_ids(&game_server);

        let Some(service) = self
            .get(Kind::Service, id, self.store.get_service(id))
            .await?
        else {
            return Ok(State::NoService(game_server));
        };

        let endpoints = self
            .get(Kind::Endpoints, id, self.store.get_endpoints(id))
            .await?;
        if !endpoints.as_ref().is_some_and(has_ready_subsets) {
            return Ok(State::AwaitingEndpoints);
        }

        match self
            .get(Kind::IngressRoute, id, self.store.get_ingress_route(id))
            .await?
        {
            None => Ok(State::NoRoute {
                game_server,
                service,
            }),
            Some(_) => Ok(State::Converged),
        }
    }

    async fn get<T>(
        &self,
        kind: Kind,
        id: &ResourceId,
        get: impl Future<Output = Result<Option<T>, StoreError>>,
    ) -> Result<Option<T>, Error> {
        get.await.map_err(|source| {
            self.metrics.store_error(kind);
            Error::Get {
                kind,
                id: id.clone(),
                source,
            }
        })
    }

    async fn create(
        &self,
        kind: Kind,
        id: &ResourceId,
        create: impl Future<Output = Result<Created, StoreError>>,
    ) -> Result<(), Error> {
        let created = create.await.map_err(|source| {
            self.metrics.store_error(kind);
            Error::Create {
                kind,
                id: id.clone(),
                source,
            }
        })?;
        self.metrics.created(kind, created);
        match created {
            Created::Created => info!(%kind, "Created"),
            // Another reconciliation got there first.
            Created::AlreadyExists | Created::Conflict => {
                info!(%kind, result = created.as_str(), "Already created; skipping")
            }
        }
        Ok(())
    }
}

// === impl State ===

impl State {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkloadMissing => "workload_missing",
            Self::NoService(_) => "no_service",
            Self::AwaitingEndpoints => "awaiting_endpoints",
            Self::NoRoute { .. } => "no_route",
            Self::Converged => "converged",
        }
    }
}

/// Adds the GameServer's build and title to the current span.
fn record_ids(gs: &GameServer) {
    let span = Span::current();
    if let Some(build_id) = &gs.spec.build_id {
        span.record("build_id", field::display(build_id));
    }
    if let Some(title_id) = &gs.spec.title_id {
        span.record("title_id", field::display(title_id));
    }
}

/// A subset is ready when it has at least one ready address; addresses that
/// are not ready are listed separately.
fn has_ready_subsets(endpoints: &Endpoints) -> bool {
    endpoints
        .subsets
        .iter()
        .flatten()
        .any(|subset| subset.addresses.as_ref().is_some_and(|a| !a.is_empty()))
}
