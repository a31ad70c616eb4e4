pub mod fs;
pub mod memory;

pub use fs::FsMount;
pub use memory::MemoryMount;
