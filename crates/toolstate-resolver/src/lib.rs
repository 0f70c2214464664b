mod index;
mod select;
mod types;

pub use index::{resolve_latest, IndexOptions, PackageIndex, DEFAULT_INDEX_ENDPOINT};
pub use select::select_latest_release;
pub use types::{IndexDocument, IndexInfo, ReleaseFile};
