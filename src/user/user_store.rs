use super::auth::{AuthToken, AuthTokenValue, PasswordCredentials};
use super::user_models::{NewUser, User};
use anyhow::Result;

pub trait UserAuthCredentialsStore: Send + Sync {
    /// Returns the password credentials for the given username.
    /// Returns Ok(None) if the user does not exist or has no password set.
    fn get_password_credentials(&self, username: &str) -> Result<Option<PasswordCredentials>>;

    /// Sets or replaces the user's password credentials.
    fn set_password_credentials(&self, credentials: &PasswordCredentials) -> Result<()>;
}

pub trait UserAuthTokenStore: Send + Sync {
    /// Returns the auth token for the given token value.
    /// Returns Ok(None) if the token does not exist.
    fn get_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Adds a new auth token.
    fn add_auth_token(&self, token: &AuthToken) -> Result<()>;

    /// Deletes an auth token given the token value.
    /// Returns Ok(None) if the token does not exist.
    fn delete_auth_token(&self, value: &AuthTokenValue) -> Result<Option<AuthToken>>;

    /// Stamps the token's last_used timestamp.
    fn touch_auth_token(&self, value: &AuthTokenValue) -> Result<()>;
}

pub trait UserStore: UserAuthTokenStore + UserAuthCredentialsStore + Send + Sync {
    /// Creates a new user and returns the user id.
    /// Fails if the username or email is already taken.
    fn create_user(&self, new_user: &NewUser) -> Result<i64>;

    /// Returns the user with the given id, or None if absent.
    fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Returns the user with the given username, or None if absent.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Returns all users ordered by username.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Deletes a user. Assignments, notes, credentials and tokens owned by
    /// the user are cascade-deleted by the store.
    /// Returns false if the user did not exist.
    fn delete_user(&self, user_id: i64) -> Result<bool>;
}
