mod auth;
mod health_check;
mod posts;
mod users;

pub use auth::refresh;
pub use health_check::health_check;
pub use posts::{create_post, delete_post, get_post, list_posts, update_post};
pub use users::{login, me, register};
