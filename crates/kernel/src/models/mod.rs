//! Database models.

pub mod account;
pub mod blog_post;
pub mod user;

pub use account::Account;
pub use blog_post::{BlogPost, MAX_LIST_LIMIT, Viewer};
pub use user::User;
