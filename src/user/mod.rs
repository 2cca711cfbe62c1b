pub mod auth;
pub mod user_models;
pub mod user_store;

pub use auth::{AuthToken, AuthTokenValue, CredentialHasher, PasswordCredentials};
pub use user_models::{NewUser, User};
pub use user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
