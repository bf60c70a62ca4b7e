/// Authentication module
///
/// Password hashing, JWT access tokens, opaque refresh tokens, the hashed
/// token store, and the session lifecycle that ties them together.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;
mod token_store;

pub use claims::Claims;
pub use jwt::{generate_access_token, validate_access_token};
pub use password::{hash_password, verify_password, PASSWORD_HASH_COST};
pub use refresh_token::{generate_refresh_token, hash_token};
pub use session::SessionManager;
pub use token_store::{
    find_active_refresh_token_by_raw, is_access_token_active, record_access_token,
    record_refresh_token,
};
