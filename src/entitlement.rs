//! Local mirror of the server-side entitlement record.
//!
//! The client never decrements counters itself. Every value here is the last
//! one the backend reported, replaced wholesale on each refresh.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_FREE_REQUESTS;
use crate::error::StoreError;
use crate::types::UserId;

/// Subscription level shown while signed out or before the first refresh.
pub const NO_SUBSCRIPTION: &str = "No subscription";

/// Subscription tier plus usage counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Subscription level exactly as the backend reports it.
    pub tier: String,
    pub request_count: u32,
    pub free_requests_remaining: u32,
}

impl Entitlement {
    /// Signed-out defaults.
    #[must_use]
    pub fn unauthenticated(free_requests: u32) -> Self {
        Self {
            tier: NO_SUBSCRIPTION.into(),
            request_count: 0,
            free_requests_remaining: free_requests,
        }
    }
}

impl Default for Entitlement {
    fn default() -> Self {
        Self::unauthenticated(DEFAULT_FREE_REQUESTS)
    }
}

/// Per-user record kept by the backend's document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub subscription_level: Option<String>,
    #[serde(default)]
    pub request_count: Option<u32>,
    #[serde(default)]
    pub free_requests_remaining: Option<u32>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserDocument {
    /// Entitlement described by this document, filling absent fields with defaults.
    #[must_use]
    pub fn entitlement(&self, default_free_requests: u32) -> Entitlement {
        Entitlement {
            tier: self
                .subscription_level
                .clone()
                .unwrap_or_else(|| NO_SUBSCRIPTION.into()),
            request_count: self.request_count.unwrap_or(0),
            free_requests_remaining: self
                .free_requests_remaining
                .unwrap_or(default_free_requests),
        }
    }
}

/// Read access to the backend's per-user documents.
///
/// Implemented by the embedding application over whatever document service
/// the deployment uses.
pub trait UserDocumentStore: Send + Sync + 'static {
    /// Fetch the document keyed by `user_id`. `Ok(None)` if it does not exist.
    fn fetch(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<UserDocument>, StoreError>> + Send;
}

/// In-process document store, for offline use and tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<UserId, UserDocument>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user_id: UserId, doc: UserDocument) {
        self.docs.write().insert(user_id, doc);
    }
}

impl UserDocumentStore for MemoryDocumentStore {
    async fn fetch(&self, user_id: &UserId) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.docs.read().get(user_id).cloned())
    }
}

/// Cached [`Entitlement`] for the signed-in user.
pub struct EntitlementCache<D> {
    store: D,
    current: RwLock<Stamped>,
    default_free_requests: u32,
}

/// Entitlement plus the generation it belongs to. `reset` bumps the
/// generation; a refresh only lands if the generation it started in is
/// still current.
struct Stamped {
    entitlement: Entitlement,
    generation: u64,
}

impl<D: UserDocumentStore> EntitlementCache<D> {
    #[must_use]
    pub fn new(store: D, default_free_requests: u32) -> Self {
        Self {
            store,
            current: RwLock::new(Stamped {
                entitlement: Entitlement::unauthenticated(default_free_requests),
                generation: 0,
            }),
            default_free_requests,
        }
    }

    /// Copy of the current entitlement.
    #[must_use]
    pub fn snapshot(&self) -> Entitlement {
        self.current.read().entitlement.clone()
    }

    /// Re-reads the user's document and replaces the cached entitlement.
    ///
    /// Best-effort: on failure the previous value stays and the error is only
    /// logged. Returns the fetched document so callers can pick up profile fields.
    ///
    /// A [`reset`](Self::reset) while the fetch is in flight discards its
    /// result, so a sign-out can never be overwritten by the previous user's
    /// record.
    pub async fn refresh(&self, user_id: &UserId) -> Option<UserDocument> {
        let started_in = self.current.read().generation;
        match self.store.fetch(user_id).await {
            Ok(Some(doc)) => {
                let entitlement = doc.entitlement(self.default_free_requests);
                let mut current = self.current.write();
                if current.generation != started_in {
                    tracing::debug!(user_id = %user_id, "Cache reset during refresh; dropping result");
                    return None;
                }
                tracing::debug!(
                    tier = %entitlement.tier,
                    request_count = entitlement.request_count,
                    free_requests_remaining = entitlement.free_requests_remaining,
                    "Entitlement refreshed"
                );
                current.entitlement = entitlement;
                Some(doc)
            }
            Ok(None) => {
                tracing::debug!(user_id = %user_id, "No user document; keeping cached entitlement");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, "Entitlement refresh failed");
                None
            }
        }
    }

    /// Back to signed-out defaults.
    pub fn reset(&self) {
        let mut current = self.current.write();
        current.entitlement = Entitlement::unauthenticated(self.default_free_requests);
        current.generation += 1;
    }
}
