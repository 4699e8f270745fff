#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use apexvision_client::identity::{FederatedUser, GoogleTokens, ProviderError};
use apexvision_client::{
    ApexClient, ClientConfig, Credential, FederatedAuth, GoogleSignIn, MemoryDocumentStore,
    StoreError, UserDocument, UserDocumentStore, UserId,
};
use parking_lot::Mutex;
use tokio::sync::Notify;
use wiremock::MockServer;

pub struct StubGoogle {
    pub result: Result<GoogleTokens, ProviderError>,
}

impl StubGoogle {
    pub fn ok() -> Self {
        Self {
            result: Ok(GoogleTokens {
                id_token: Some("google-id-token".into()),
                access_token: "google-access".into(),
            }),
        }
    }
}

impl GoogleSignIn for StubGoogle {
    type Context = ();

    async fn sign_in(&self, _: &()) -> Result<GoogleTokens, ProviderError> {
        self.result.clone()
    }

    fn sign_out(&self) {}
}

#[derive(Default)]
pub struct StubFederated {
    pub credentials: Arc<Mutex<Vec<Credential>>>,
    pub persisted: Mutex<Option<FederatedUser>>,
    pub refuse_sign_out: bool,
}

impl FederatedAuth for StubFederated {
    async fn sign_in(&self, credential: &Credential) -> Result<FederatedUser, ProviderError> {
        self.credentials.lock().push(credential.clone());
        Ok(FederatedUser {
            uid: "fed-1".into(),
            email: Some("ada@example.com".into()),
            display_name: Some("Ada Lovelace".into()),
        })
    }

    fn current_user(&self) -> Option<FederatedUser> {
        self.persisted.lock().clone()
    }

    fn sign_out(&self) -> Result<(), ProviderError> {
        if self.refuse_sign_out {
            return Err(ProviderError::Failed("keychain locked".into()));
        }
        Ok(())
    }
}

/// Document store the test keeps a handle to after handing it to the client.
#[derive(Clone, Default)]
pub struct SharedDocs(pub Arc<MemoryDocumentStore>);

impl SharedDocs {
    pub fn set(&self, user_id: &str, tier: &str, request_count: u32, free: u32) {
        self.0.insert(
            UserId::from(user_id),
            UserDocument {
                subscription_level: Some(tier.into()),
                request_count: Some(request_count),
                free_requests_remaining: Some(free),
                ..UserDocument::default()
            },
        );
    }
}

impl UserDocumentStore for SharedDocs {
    async fn fetch(&self, user_id: &UserId) -> Result<Option<UserDocument>, StoreError> {
        self.0.fetch(user_id).await
    }
}

/// [`SharedDocs`] whose fetches wait on `gate` once `armed` is set.
#[derive(Clone, Default)]
pub struct GatedDocs {
    pub docs: SharedDocs,
    pub gate: Arc<Notify>,
    pub armed: Arc<AtomicBool>,
}

impl GatedDocs {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl UserDocumentStore for GatedDocs {
    async fn fetch(&self, user_id: &UserId) -> Result<Option<UserDocument>, StoreError> {
        if self.armed.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.docs.fetch(user_id).await
    }
}

pub type TestClient = ApexClient<StubGoogle, StubFederated, SharedDocs>;

pub fn client_for(server: &MockServer, docs: SharedDocs) -> TestClient {
    let config = ClientConfig::new(server.uri().parse().unwrap());
    ApexClient::new(config, StubGoogle::ok(), StubFederated::default(), docs)
}
