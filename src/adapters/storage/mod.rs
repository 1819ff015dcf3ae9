pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;
