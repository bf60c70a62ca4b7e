/// Middleware module
///
/// Optional bearer authentication for every request, and the per-route
/// login requirement layered on top of it.

mod auth_gate;
mod require_login;

pub use auth_gate::{authenticate, AuthGate, AuthenticatedUser};
pub use require_login::RequireLogin;
