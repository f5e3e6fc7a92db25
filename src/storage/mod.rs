mod autosave;
mod persist;
mod registry;
mod types;

pub use autosave::{AutoSave, SaveTrigger};
pub use persist::FeedStore;
pub use registry::Registry;
pub use types::{RegistryError, Subscription};
