//! Utility modules

pub mod fs_blob_store;
pub mod memory_storage;
pub mod simulated;
pub mod validation;

pub use fs_blob_store::*;
pub use memory_storage::*;
pub use simulated::*;
pub use validation::*;
