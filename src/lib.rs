pub mod cache;
pub mod config;
pub mod error;
pub mod helper;
pub mod http;
pub mod manifest;
pub mod progress;
pub mod reflink;
pub mod registry;
pub mod repo;
pub mod request;
pub mod resolver;
pub mod runtime;

pub use error::{ResolveError, Result};
pub use helper::Helper;
pub use request::{Names, Options, ResolutionJob};
pub use resolver::Resolver;
