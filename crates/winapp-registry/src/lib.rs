mod error;
mod marshal;
mod memory;
mod store;
mod view;
#[cfg(windows)]
mod windows;

pub use error::{RegistryError, Target};
pub use marshal::{MAX_VALUE_SIZE, READ_BUFFER_SIZE};
pub use memory::{MemoryKey, MemoryStore};
pub use store::{Access, Hive, Store, StoreError, StoreKey, ValueKind, WordWidth};
pub use view::{View, UNINSTALL_ROOT};
#[cfg(windows)]
pub use windows::{WindowsKey, WindowsStore};

#[cfg(test)]
mod tests;
