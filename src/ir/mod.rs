//! Intermediate representation produced by resolution and consumed read-only by emitters.

pub mod auth;
pub mod code;
pub mod database;
pub mod http;

pub use auth::*;
pub use code::*;
pub use database::*;
pub use http::*;
