use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::trace;
use twox_hash::xxh3::{Hash128, HasherExt};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Content fingerprint of a regular file: XXH3-128 of its bytes, as 32 hex digits.
///
/// The file is streamed through a fixed buffer, so memory use does not grow with
/// file size.
pub fn file_checksum(file: &Path) -> io::Result<String> {
    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, File::open(file)?);
    let mut hasher = Hash128::with_seed(0);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.write(&buffer[..bytes_read]);
    }

    let checksum = format_checksum(hasher.finish_ext());
    trace!("Checksum for {}: {}", file.display(), checksum);
    Ok(checksum)
}

pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Hash128::with_seed(0);
    hasher.write(data);
    format_checksum(hasher.finish_ext())
}

fn format_checksum(hash: u128) -> String {
    format!("{:032x}", hash)
}

/// Whether the content at `path` still matches the `stored` fingerprint.
///
/// Directories always match. A missing path, an unreadable file, or a file with no
/// stored fingerprint does not.
pub fn is_synchronized(path: &Path, stored: Option<&str>) -> bool {
    if !path.exists() {
        return false;
    }
    if path.is_dir() {
        return true;
    }
    match (stored, file_checksum(path)) {
        (Some(stored), Ok(current)) => stored == current,
        (_, Err(e)) => {
            trace!("Could not fingerprint {}: {}", path.display(), e);
            false
        }
        (None, Ok(_)) => false,
    }
}
