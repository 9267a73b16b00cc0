use crate::k8s::{Api, ObjectMeta};
use anyhow::Result;
use k8s_openapi::api::coordination::v1 as coordv1;
use kube::api::PatchParams;
use std::sync::Arc;
use tokio::{sync::watch, time};

const LEASE_DURATION: time::Duration = time::Duration::from_secs(30);
const RENEW_GRACE_PERIOD: time::Duration = time::Duration::from_secs(1);
const FIELD_MANAGER: &str = "gameserver-ingress-controller";

/// A claim on the controller's Lease, held on behalf of one pod.
pub struct Lease {
    claimant: String,
    claims: watch::Receiver<Arc<kubert::lease::Claim>>,
}

/// Creates the Lease if needed and starts competing for it.
pub async fn init<T>(
    runtime: &kubert::Runtime<T>,
    ns: &str,
    name: &str,
    claimant: &str,
) -> Result<Lease> {
    let lease = coordv1::Lease {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(ns.to_string()),
            // Specifying a resource version of "0" means that we will
            // only create the Lease if it does not already exist.
            resource_version: Some("0".to_string()),
            labels: Some(
                [(
                    "app.kubernetes.io/component".to_string(),
                    "gameserver-ingress-controller".to_string(),
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        },
        spec: None,
    };
    let api = Api::<coordv1::Lease>::namespaced(runtime.client(), ns);
    match api
        .patch(
            name,
            &PatchParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            },
            &kube::api::Patch::Apply(lease),
        )
        .await
    {
        Ok(lease) => tracing::info!(?lease, "Created Lease resource"),
        Err(kube::Error::Api(_)) => tracing::debug!("Lease already exists, no need to create it"),
        Err(error) => {
            return Err(error.into());
        }
    };

    let params = kubert::lease::ClaimParams {
        lease_duration: LEASE_DURATION,
        renew_grace_period: RENEW_GRACE_PERIOD,
    };
    let (claims, _task) = kubert::lease::LeaseManager::init(api, name)
        .await?
        .spawn(claimant, params)
        .await?;
    Ok(Lease {
        claimant: claimant.to_string(),
        claims,
    })
}

impl Lease {
    /// Waits until this pod holds the Lease.
    pub async fn acquired(&mut self) -> Result<()> {
        loop {
            if self.claims.borrow_and_update().is_current_for(&self.claimant) {
                tracing::info!(claimant = %self.claimant, "Acquired Lease");
                return Ok(());
            }
            self.claims.changed().await?;
        }
    }

    /// Completes once this pod no longer holds the Lease.
    pub async fn lost(mut self) {
        loop {
            let holder = {
                let claim = self.claims.borrow_and_update();
                if !claim.is_current_for(&self.claimant) {
                    Some(claim.holder.clone())
                } else {
                    None
                }
            };
            if let Some(holder) = holder {
                tracing::warn!(%holder, "Lease lost");
                return;
            }
            if self.claims.changed().await.is_err() {
                tracing::warn!("Lease manager stopped");
                return;
            }
        }
    }
}
