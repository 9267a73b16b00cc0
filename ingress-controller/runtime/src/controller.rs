use crate::{
    core::OWNER_LABEL,
    k8s::{Api, Client, Endpoints, GameServer, IngressRoute, ResourceExt, ResourceId, Service},
    lease::Lease,
    reconcile::{Error, KubeStore, Outcome, Reconciler},
};
use anyhow::{bail, Result};
use futures::prelude::*;
use kube::runtime::{
    controller::{self, Action},
    reflector::ObjectRef,
    watcher, Controller,
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub(crate) struct Context {
    reconciler: Reconciler<KubeStore>,
    error_requeue: Duration,
}

impl Context {
    pub(crate) fn new(reconciler: Reconciler<KubeStore>, error_requeue: Duration) -> Self {
        Self {
            reconciler,
            error_requeue,
        }
    }
}

/// Runs the GameServer controller until shutdown.
///
/// When `lease` is set, reconciliation only starts once the Lease is held,
/// and an error is returned if it is lost.
pub(crate) async fn run(
    client: Client,
    ctx: Context,
    lease: Option<Lease>,
    drain: drain::Watch,
) -> Result<()> {
    let lost = match lease {
        Some(mut lease) => {
            info!("Waiting for Lease");
            lease.acquired().await?;
            lease.lost().left_future()
        }
        None => future::pending().right_future(),
    };

    // Services and IngressRoutes carry a controller reference to their
    // GameServer. Endpoints carry the owner label copied from their Service.
    let controller = Controller::new(
        Api::<GameServer>::all(client.clone()),
        watcher::Config::default(),
    )
    .owns(Api::<Service>::all(client.clone()), watcher::Config::default())
    .owns(
        Api::<IngressRoute>::all(client.clone()),
        watcher::Config::default(),
    )
    .watches(
        Api::<Endpoints>::all(client),
        endpoints_watcher(),
        game_server_for_endpoints,
    )
    .shutdown_on_signal()
    .run(reconcile, error_policy, Arc::new(ctx))
    .for_each(|res| async move {
        match res {
            Ok((obj, _)) => debug!(ns = ?obj.namespace, name = %obj.name, "Reconciled"),
            // Already logged by the error policy.
            Err(controller::Error::ReconcilerFailed(..)) => {}
            // A dependent changed after its GameServer was deleted.
            Err(controller::Error::ObjectNotFound(obj)) => {
                debug!(%obj, "GameServer not found")
            }
            Err(error) => warn!(%error, "Controller failed"),
        }
    });

    tokio::pin!(controller);
    info!("GameServer controller started");
    tokio::select! {
        _ = (&mut controller) => {}
        _ = lost => bail!("lost the controller Lease"),
        handle = drain.signaled() => {
            handle.release_after(controller).await;
        }
    }
    Ok(())
}

async fn reconcile(gs: Arc<GameServer>, ctx: Arc<Context>) -> Result<Action, Error> {
    let id = ResourceId::new(gs.namespace().unwrap_or_default(), gs.name_any());
    let outcome = ctx.reconciler.reconcile(&id).await?;
    Ok(action(outcome))
}

fn error_policy(gs: Arc<GameServer>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(
        ns = ?gs.namespace(),
        name = %gs.name_any(),
        error = ?error,
        "Reconciliation failed",
    );
    Action::requeue(ctx.error_requeue)
}

/// Limits the Endpoints watch to those of Services created for GameServers.
fn endpoints_watcher() -> watcher::Config {
    watcher::Config::default().labels(OWNER_LABEL)
}

fn game_server_for_endpoints(endpoints: Endpoints) -> Option<ObjectRef<GameServer>> {
    let name = endpoints.labels().get(OWNER_LABEL)?;
    let ns = endpoints.namespace()?;
    Some(ObjectRef::new(name).within(&ns))
}

fn action(outcome: Outcome) -> Action {
    match outcome {
        Outcome::Done => Action::await_change(),
        Outcome::RequeueAfter(delay) => Action::requeue(delay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::ObjectMeta;
    use std::collections::BTreeMap;

    fn mk_endpoints(ns: &str, name: &str, labels: &[(&str, &str)]) -> Endpoints {
        Endpoints {
            metadata: ObjectMeta {
                namespace: Some(ns.to_string()),
                name: Some(name.to_string()),
                labels: Some(
                    labels
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>(),
                ),
                ..Default::default()
            },
            subsets: None,
        }
    }

    #[test]
    fn watches_owned_endpoints_only() {
        assert_eq!(
            endpoints_watcher().label_selector.as_deref(),
            Some("OwningGameServer")
        );
    }

    #[test]
    fn maps_endpoints_to_owning_game_server() {
        let endpoints = mk_endpoints("ns-0", "gs-0", &[("OwningGameServer", "gs-0")]);
        assert_eq!(
            game_server_for_endpoints(endpoints),
            Some(ObjectRef::new("gs-0").within("ns-0"))
        );
    }

    #[test]
    fn ignores_unowned_endpoints() {
        let endpoints = mk_endpoints("kube-system", "kube-dns", &[("k8s-app", "kube-dns")]);
        assert_eq!(game_server_for_endpoints(endpoints), None);
    }

    #[test]
    fn maps_outcomes_to_actions() {
        assert_eq!(action(Outcome::Done), Action::await_change());
        assert_eq!(
            action(Outcome::RequeueAfter(Duration::from_secs(1))),
            Action::requeue(Duration::from_secs(1))
        );
    }
}
