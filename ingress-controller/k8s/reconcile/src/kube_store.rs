use crate::store::{Created, ResourceStore, StoreError};
use ingress_controller_k8s_api::{
    Api, Client, Endpoints, GameServer, IngressRoute, NamespaceResourceScope, PostParams,
    Resource, ResourceExt, ResourceId, Service,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use tokio::time;

/// Status reasons the API server sends with a 409.
const REASON_ALREADY_EXISTS: &str = "AlreadyExists";

/// A [`ResourceStore`] backed by the Kubernetes API.
///
/// Every request is bounded by `timeout`; a request that is abandoned never
/// leaves a partially written object behind.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    timeout: time::Duration,
}

impl KubeStore {
    pub fn new(client: Client, timeout: time::Duration) -> Self {
        Self { client, timeout }
    }

    async fn get<K>(&self, id: &ResourceId) -> Result<Option<K>, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + fmt::Debug,
        K::DynamicType: Default,
    {
        let api = Api::<K>::namespaced(self.client.clone(), &id.namespace);
        let obj = time::timeout(self.timeout, api.get_opt(&id.name))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;
        Ok(obj)
    }

    async fn create<K>(&self, obj: &K) -> Result<Created, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + fmt::Debug,
        K::DynamicType: Default,
    {
        let ns = obj.namespace().ok_or(StoreError::MissingNamespace)?;
        let api = Api::<K>::namespaced(self.client.clone(), &ns);
        let res = time::timeout(self.timeout, api.create(&PostParams::default(), obj))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?;
        match res {
            Ok(_) => Ok(Created::Created),
            Err(kube::Error::Api(rsp)) if rsp.code == 409 => {
                tracing::debug!(name = %obj.name_any(), reason = %rsp.reason, "Object exists");
                if rsp.reason == REASON_ALREADY_EXISTS {
                    Ok(Created::AlreadyExists)
                } else {
                    Ok(Created::Conflict)
                }
            }
            Err(error) => Err(error.into()),
        }
    }
}

impl fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeStore")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn get_game_server(&self, id: &ResourceId) -> Result<Option<GameServer>, StoreError> {
        self.get(id).await
    }

    async fn get_service(&self, id: &ResourceId) -> Result<Option<Service>, StoreError> {
        self.get(id).await
    }

    async fn get_endpoints(&self, id: &ResourceId) -> Result<Option<Endpoints>, StoreError> {
        self.get(id).await
    }

    async fn get_ingress_route(
        &self,
        id: &ResourceId,
    ) -> Result<Option<IngressRoute>, StoreError> {
        self.get(id).await
    }

    async fn create_service(&self, service: &Service) -> Result<Created, StoreError> {
        self.create(service).await
    }

    async fn create_ingress_route(&self, route: &IngressRoute) -> Result<Created, StoreError> {
        self.create(route).await
    }
}
