//! Per-credential client cache
//!
//! Every caller presenting the same API key shares one client. Lookups take a
//! shared lock; only the first use of a key takes the write lock, and the key
//! is checked again under it so concurrent first uses build one client.
//! Entries live for the whole process: rotating a key needs a restart.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::client::BackendClient;

type BuildFn<C> = dyn Fn(&str) -> C + Send + Sync;

/// Lazily built clients keyed by credential
pub struct ClientCache<C> {
    default: Arc<C>,
    clients: RwLock<HashMap<String, Arc<C>>>,
    build: Box<BuildFn<C>>,
}

/// Cache of backend clients, one per API key
pub type BackendClientCache = ClientCache<BackendClient>;

impl<C> ClientCache<C> {
    /// `default` serves callers without a credential; `build` binds a new
    /// client to a credential and must not fail.
    pub fn new(default: C, build: impl Fn(&str) -> C + Send + Sync + 'static) -> Self {
        Self {
            default: Arc::new(default),
            clients: RwLock::new(HashMap::new()),
            build: Box::new(build),
        }
    }

    /// Client for `credential`, or the default client when there is none.
    pub fn resolve(&self, credential: Option<&str>) -> Arc<C> {
        let Some(credential) = credential.filter(|c| !c.trim().is_empty()) else {
            return Arc::clone(&self.default);
        };

        if let Some(client) = self.clients.read().get(credential) {
            return Arc::clone(client);
        }

        let mut clients = self.clients.write();
        if let Some(client) = clients.get(credential) {
            return Arc::clone(client);
        }

        debug!(cached = clients.len(), "Creating client for new credential");
        let client = Arc::new((self.build)(credential));
        clients.insert(credential.to_string(), Arc::clone(&client));
        client
    }

    pub fn default_client(&self) -> Arc<C> {
        Arc::clone(&self.default)
    }

    /// Number of credential-bound clients created so far
    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BackendClientCache {
    /// Cache whose per-key clients share `default`'s connection pool
    pub fn for_backend(default: BackendClient) -> Self {
        let base = default.clone();
        Self::new(default, move |api_key| base.with_api_key(api_key))
    }
}

impl<C> std::fmt::Debug for ClientCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("cached", &self.len())
            .finish_non_exhaustive()
    }
}
