#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod error;
pub mod paths;
pub mod resolver;
pub mod version;

pub use config::{Config, ResolverConfig};
pub use error::{ConfigWarning, ResolveError};
pub use resolver::{
    AliasTable, PackageDescriptor, ResolveOutcome, ResolveRequest, ResolvedFile, ResolvedModule,
    Resolver, ResolverStats, TsPaths,
};
pub use version::VERSION;
