pub mod xxhash;

pub use xxhash::{file_checksum, is_synchronized};
