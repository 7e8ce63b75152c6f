// Declare submodules
pub mod credentials;
pub mod jwt;

// Re-export public items
pub use credentials::{strategy_from_config, BearerToken, CredentialStrategy, SessionCookie};
pub use jwt::ensure_not_expired;
