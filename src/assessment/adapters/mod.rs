//! Port implementations: filesystem store, Kanbus tracker, repository
//! scanners, and in-memory fakes for tests.

mod fs;
mod kanbus;
mod memory;
mod scan;

pub use fs::{FsAssessmentStore, FsCatalogSource};
pub use kanbus::KanbusTracker;
pub use memory::{InMemoryCatalog, InMemoryStore, InMemoryTracker};
pub use scan::{detect_inventory, CommandScanner};
