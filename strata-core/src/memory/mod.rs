//! In-process adapters for every port. Used by the test suites and by
//! `stratactl scan`, which runs the pipeline without external storage.

mod audit;
mod catalog;
mod index;

pub use audit::MemoryAuditLog;
pub use catalog::MemoryCatalog;
pub use index::MemoryIndex;
