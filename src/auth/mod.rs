//! Authentication Module
//! Mission: Secure API access with signed session tokens and role checks

pub mod api;
pub mod middleware;
pub mod models;
pub mod token;
pub mod user_store;

pub use api::AuthState;
pub use middleware::auth_middleware;
pub use token::{TokenError, TokenSigner};
pub use user_store::UserStore;
