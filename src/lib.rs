mod auth;
mod case_insensitive_string_ext;
mod client;
mod config;
mod error;
mod gate;
mod routes;
mod server;
mod types;
mod validation;

pub use auth::*;
pub use client::*;
pub use config::*;
pub use error::*;
pub use gate::*;
pub use routes::*;
pub use server::*;
pub use types::*;
pub use validation::*;
