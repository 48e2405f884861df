pub mod auth;
pub mod config;
pub mod query_store;
pub mod snippet_api;
pub mod snippet_operations;

pub use auth::{
    AccessTokenProvider, AuthError, ClientCredentialsProvider, StaticTokenProvider,
    UnauthenticatedProvider,
};
pub use config::{AuthConfig, Config, ConfigError};
pub use query_store::SnippetStore;
pub use snippet_api::{ApiError, SnippetApiClient};
pub use snippet_operations::SnippetOperations;
