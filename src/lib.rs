#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod entitlement;
pub mod error;
pub mod identity;
pub mod nonce;
pub mod policy;
pub mod preferences;
pub mod session;
pub mod stats;
mod storage;
pub mod types;
pub mod vault;

// Re-exports for convenient access
pub use client::{ApexClient, Feature};
pub use config::ClientConfig;
pub use dispatch::Dispatcher;
pub use entitlement::{
    Entitlement, EntitlementCache, MemoryDocumentStore, UserDocument, UserDocumentStore,
};
pub use error::{AuthError, Error, NetworkError, StoreError};
pub use identity::{
    AppleAuthorization, AppleSignInRequest, AuthState, Credential, FederatedAuth, GoogleSignIn,
    Identity, IdentityBroker,
};
pub use nonce::{generate_nonce, nonce_digest};
pub use policy::{QuotaVerdict, VerdictReason};
pub use preferences::{FontSize, PreferenceStore, Preferences};
pub use session::{
    ConversationSession, ConversationTurn, HistoryStore, JsonFileHistory, MemoryHistory,
    SessionStore,
};
pub use stats::UserStats;
pub use types::{Originator, Provider, SessionId, TurnId, UserId};
pub use vault::TokenVault;
