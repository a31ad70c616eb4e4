pub mod checksum;
mod error;
mod mounts;
mod traits;

pub use error::MountError;
pub use mounts::{FsMount, MemoryMount};
pub use traits::Mount;
