//! Domain types and models

pub mod credentials;
pub mod sync;
pub mod trakt;

pub use credentials::{BearerToken, Credentials, StoredCredentials};
pub use sync::{normalize_id, IdKind, ListTargets, MediaIds, MediaKind, SyncOutcome, SyncRequest};
pub use trakt::{
    AccessTokenResponse, DeviceCodeRequest, DeviceCodeResponse, DeviceTokenRequest, ItemIds,
    KindCounts, ListItem, ListItemsRequest, ListItemsResponse, RefreshTokenRequest,
};
