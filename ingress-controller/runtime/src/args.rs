use crate::{
    controller::{self, Context},
    core::{EntryPoints, RoutingConfig},
    k8s::{Client, GameServer, IngressRoute, Resource},
    lease,
    reconcile::{KubeStore, Metrics, Reconciler},
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use prometheus_client::registry::Registry;
use tokio::time::Duration;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "gameserver-ingress",
    about = "Exposes game servers through Traefik IngressRoutes"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_controller=info,warn",
        env = "INGRESS_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// Name of the Traefik Middleware attached to every route.
    #[clap(long, env = "MIDDLEWARE_NAME")]
    middleware_name: String,

    /// Namespace of the Middleware. Defaults to each route's namespace.
    #[clap(long, env = "MIDDLEWARE_NAMESPACE")]
    middleware_namespace: Option<String>,

    #[clap(long, env = "NON_TLS_ENTRYPOINT")]
    non_tls_entry_point: Option<String>,

    #[clap(long, env = "TLS_ENTRYPOINT")]
    tls_entry_point: Option<String>,

    /// Externally visible host name that routes match on.
    #[clap(long, env = "DNS_NAME")]
    dns_name: String,

    /// Bounds each Kubernetes API request made while reconciling.
    #[clap(long, default_value = "5000")]
    store_timeout_ms: u64,

    /// Delay before retrying a GameServer whose reconciliation failed.
    #[clap(long, default_value = "5")]
    error_requeue_secs: u64,

    /// Only reconcile while holding the controller Lease.
    #[clap(long)]
    leader_elect: bool,

    #[clap(long, env = "POD_NAMESPACE", default_value = "default")]
    lease_namespace: String,

    #[clap(long, default_value = "gameserver-ingress-controller")]
    lease_name: String,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let routing = self.routing_config()?;
        let Self {
            log_level,
            log_format,
            client,
            admin,
            store_timeout_ms,
            error_requeue_secs,
            leader_elect,
            lease_namespace,
            lease_name,
            ..
        } = self;

        let mut prom = <Registry>::default();
        let metrics = Metrics::register(prom.sub_registry_with_prefix("gameserver_ingress"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        if routing.middleware().namespace.is_none() {
            info!("MIDDLEWARE_NAMESPACE is not set; middleware resolves in each route's namespace");
        }
        info!(
            host = %routing.host(),
            middleware = %routing.middleware().name,
            entry_points = ?routing.entry_points(),
            "Routing configured",
        );

        let client = runtime.client();
        for (exists, kind) in [
            (api_resource_exists::<GameServer>(&client).await, "GameServer"),
            (api_resource_exists::<IngressRoute>(&client).await, "IngressRoute"),
        ] {
            if !exists {
                bail!("{kind} resource kind not found; is its CRD installed?");
            }
        }

        let lease = if leader_elect {
            let hostname =
                std::env::var("HOSTNAME").context("failed to read `HOSTNAME` for leader election")?;
            Some(lease::init(&runtime, &lease_namespace, &lease_name, &hostname).await?)
        } else {
            None
        };

        let store = KubeStore::new(client.clone(), Duration::from_millis(store_timeout_ms));
        let ctx = Context::new(
            Reconciler::new(store, routing, metrics),
            Duration::from_secs(error_requeue_secs),
        );
        let controller = tokio::spawn(
            controller::run(client, ctx, lease, runtime.shutdown_handle())
                .instrument(info_span!("gameservers")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for
        // the controller to complete before exiting.
        tokio::select! {
            res = runtime.run() => {
                if res.is_err() {
                    bail!("Aborted");
                }
            }
            res = controller => res??,
        }

        Ok(())
    }

    fn routing_config(&self) -> Result<RoutingConfig> {
        let routing = RoutingConfig::new(
            self.dns_name.clone(),
            self.middleware_name.clone(),
            self.middleware_namespace.clone(),
            EntryPoints {
                non_tls: self.non_tls_entry_point.clone(),
                tls: self.tls_entry_point.clone(),
            },
        )?;
        Ok(routing)
    }
}

async fn api_resource_exists<T>(client: &Client) -> bool
where
    T: Resource,
    T::DynamicType: Default,
{
    let dt = Default::default();
    client
        .list_api_group_resources(&T::api_version(&dt))
        .await
        .ok()
        .iter()
        .flat_map(|r| r.resources.iter())
        .any(|r| r.kind == T::kind(&dt))
}
