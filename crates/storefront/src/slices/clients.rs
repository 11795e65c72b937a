//! Client slice, seeded once from the remote user list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use online_shop_core::{
    Address, Client, ClientDraft, ClientId, ClientStatus, Email, ValidationError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::ReloadFromStorage;
use super::entropy::Entropy;
use crate::catalog::{CatalogSource, RawUser, RemoteFetchError};
use crate::error::{MutationError, NotFoundError};
use crate::storage::DurableStore;

/// Zip code given to every seeded client.
pub const SEEDED_ZIP_CODE: &str = "12345-6789";

/// How [`ClientStore::initialize`] obtained its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeding {
    /// The durable record already held clients; nothing was fetched.
    Restored(usize),
    /// The remote user list was fetched, adapted and saved.
    Seeded(usize),
}

/// Client slice bound to its durable record.
pub struct ClientStore {
    clients: RwLock<Vec<Client>>,
    loading: AtomicBool,
    store: DurableStore,
    key: String,
    entropy: Arc<Entropy>,
}

impl ClientStore {
    #[must_use]
    pub fn new(store: DurableStore, key: impl Into<String>, entropy: Arc<Entropy>) -> Self {
        Self {
            clients: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
            store,
            key: key.into(),
            entropy,
        }
    }

    #[must_use]
    pub fn clients(&self) -> Vec<Client> {
        self.read().clone()
    }

    #[must_use]
    pub fn get(&self, id: ClientId) -> Option<Client> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    /// True while [`Self::initialize`] runs.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Load from storage, or seed from the remote users when storage is
    /// empty. Seeding happens at most once per durable store.
    ///
    /// A fetch that completes after `cancel` fired leaves the slice and the
    /// durable record untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteFetchError`] when seeding was needed and the fetch
    /// failed. The slice stays empty so a later call retries.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn initialize<C: CatalogSource>(
        &self,
        catalog: &C,
        cancel: &CancellationToken,
    ) -> Result<Seeding, RemoteFetchError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.initialize_inner(catalog, cancel).await;
        self.loading.store(false, Ordering::SeqCst);
        result
    }

    async fn initialize_inner<C: CatalogSource>(
        &self,
        catalog: &C,
        cancel: &CancellationToken,
    ) -> Result<Seeding, RemoteFetchError> {
        let stored = self.load_from_storage();
        if stored > 0 {
            debug!(count = stored, "Clients restored from storage");
            return Ok(Seeding::Restored(stored));
        }

        let users = catalog.fetch_users(cancel).await?;
        if cancel.is_cancelled() {
            return Err(RemoteFetchError::Cancelled {
                path: crate::catalog::paths::USERS,
            });
        }

        let mut seeded = Vec::with_capacity(users.len());
        for user in users {
            let user_id = user.id;
            match self.adapt(user) {
                Ok(client) => seeded.push(client),
                Err(e) => warn!(user_id, error = %e, "Skipping remote user with invalid email"),
            }
        }

        let count = seeded.len();
        let mut clients = self.write();
        // Another context may have seeded while we were fetching.
        if !clients.is_empty() {
            return Ok(Seeding::Restored(clients.len()));
        }
        *clients = seeded;
        self.persist(&clients);
        info!(count, "Seeded clients from remote users");
        Ok(Seeding::Seeded(count))
    }

    /// Flatten a remote user into a client with a synthetic zip, a random
    /// status and a backdated creation time.
    fn adapt(&self, user: RawUser) -> Result<Client, ValidationError> {
        let status = if self.entropy.coin_flip() {
            ClientStatus::Activated
        } else {
            ClientStatus::Deactivated
        };
        Ok(Client {
            id: ClientId::new(user.id),
            first_name: user.name.firstname,
            last_name: user.name.lastname,
            email: Email::parse(&user.email)?,
            phone: user.phone,
            address: Address {
                number: user.address.number_text(),
                street: user.address.street,
                zip_code: SEEDED_ZIP_CODE.to_string(),
                city: user.address.city,
            },
            created_at: self.entropy.backdated_timestamp(),
            status,
        })
    }

    /// Replace every client.
    pub fn set_all(&self, clients: Vec<Client>) {
        let mut state = self.write();
        *state = clients;
        self.persist(&state);
    }

    /// Validate `draft` and prepend it as an activated client with a fresh id
    /// and a backdated creation time.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::Validation`] if the draft breaks a client
    /// rule, or [`MutationError::IdsExhausted`] if no id above the held ones
    /// is left.
    #[instrument(skip_all)]
    pub fn add(&self, draft: ClientDraft) -> Result<Client, MutationError> {
        let mut state = self.write();
        if let Some(max) = state.iter().map(|c| c.id.as_i64()).max() {
            self.entropy.observe(max);
        }
        let client = Client::from_draft(
            ClientId::new(self.entropy.next_id()?),
            draft,
            self.entropy.backdated_timestamp(),
            ClientStatus::Activated,
        )?;
        state.insert(0, client.clone());
        self.persist(&state);
        debug!(id = %client.id, "Added client");
        Ok(client)
    }

    /// Replace the client with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::NotFound`] if no client has that id, or
    /// [`MutationError::Validation`] if the edited fields are invalid.
    #[instrument(skip_all, fields(id = %client.id))]
    pub fn update(&self, client: Client) -> Result<Client, MutationError> {
        let mut state = self.write();
        let slot = state
            .iter_mut()
            .find(|c| c.id == client.id)
            .ok_or(NotFoundError {
                entity: "client",
                id: client.id.as_i64(),
            })?;
        let client = client.validated()?;
        *slot = client.clone();
        self.persist(&state);
        Ok(client)
    }

    /// Remove the client with `id`. Missing ids are ignored.
    pub fn remove(&self, id: ClientId) {
        let mut state = self.write();
        state.retain(|c| c.id != id);
        self.persist(&state);
    }

    /// Overwrite memory with the durable record. Returns the new count.
    pub fn load_from_storage(&self) -> usize {
        let clients: Vec<Client> = self.store.load_collection(&self.key);
        let count = clients.len();
        *self.write() = clients;
        count
    }

    fn persist(&self, clients: &[Client]) {
        self.store.save_collection(&self.key, clients);
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Client>> {
        self.clients.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Client>> {
        self.clients.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReloadFromStorage for ClientStore {
    fn reload_from_storage(&self) {
        self.load_from_storage();
    }
}

impl std::fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStore")
            .field("key", &self.key)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}
