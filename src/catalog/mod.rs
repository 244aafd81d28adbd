//! Rule catalogs: the JSON model, where catalogs are loaded from, and the
//! registry holding the loaded ones.

mod cache;
mod check;
mod index;
mod loader;
mod model;
mod registry;

pub use cache::CachedCatalogLoader;
pub use check::MissingPath;
pub use index::{index_rules_dir, infer_tech_stack, IndexReport};
pub use loader::{BuiltinCatalogLoader, CatalogLoader, FileCatalogLoader, RemoteCatalogLoader};
pub use model::{Catalog, LocalizedText, RuleEntry, RuleFile};
pub use registry::RuleRegistry;
