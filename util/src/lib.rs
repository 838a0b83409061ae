//! Small helpers shared by the atacflow crates.

mod bitmask;
mod id_vec;
mod timer;

pub use bitmask::Bitmask;
pub use id_vec::IdVec;
pub use timer::Timer;

/// std `HashMap` with the Fx hasher.
pub type HashMap<K, V> = std::collections::HashMap<K, V, FxBuildHasher>;
pub type FxBuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

#[derive(thiserror::Error, Debug)]
#[error("Path is not valid UTF-8: {0}")]
pub struct PathEncodingError(pub String);
