// Bearer-credential lifecycle: decode, persist, refresh.

pub mod claims;
pub mod manager;
pub mod store;

pub use claims::{Credential, TokenClaims};
pub use manager::{CredentialManager, DEFAULT_REFRESH_SKEW, RefreshOutcome, TokenEndpoint};
pub use store::{CREDENTIAL_FILE_NAME, CredentialStore, JsonFileStore, StoredCredential};
