//! Module resolver for JavaScript/TypeScript bundling.
//!
//! Resolves relative, absolute and bare specifiers with alias tables,
//! TypeScript `paths`, `package.json` `main`/`browser` and `node_modules`
//! lookup, and maps each result to its bundle id.

mod alias;
mod cache;
mod engine;
mod fs_lookup;
mod node_modules;
mod pkg_json_cache;
mod request;
mod ts_paths;

pub use alias::AliasTable;
pub use cache::{OnceMap, Probe, ProbeCache};
pub use engine::{ResolveOutcome, Resolver, ResolverStats};
pub use pkg_json_cache::{
    BrowserField, BrowserTarget, PackageCache, PackageDescriptor, PackageLookup,
};
pub use request::{ResolveRequest, ResolvedFile, ResolvedModule, FORCED_PREFIX};
pub use ts_paths::{PathsMatch, TsPaths};
