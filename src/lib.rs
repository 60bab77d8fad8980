mod auth;
mod case_insensitive_string_ext;
pub mod clock;
pub mod config;
mod error;
mod fleet;
mod gate;
pub mod memory;
mod routes;
mod types;

pub use auth::*;
pub use error::*;
pub use fleet::*;
pub use gate::{authorize, with_auth, with_roles, Access, ADM, ADM_OR_EDITOR};
pub use routes::*;
pub use types::*;
