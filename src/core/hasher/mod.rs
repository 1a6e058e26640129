//! # Hasher Module
//!
//! Content digests used to decide whether two files are byte-identical.
//!
//! Files up to [`SAMPLE_THRESHOLD`] are hashed in full. Larger files are
//! sampled: three 4 KiB windows (start, middle, end) plus the file size.
//! Sampling trades certainty for speed on large videos; two files of equal
//! size that agree on all three windows are treated as identical.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// Files larger than this are sampled instead of fully hashed (10 MiB)
pub const SAMPLE_THRESHOLD: u64 = 10 * 1024 * 1024;

const BLOCK_SIZE: usize = 64 * 1024;
const SAMPLE_SIZE: usize = 4096;
const TAIL_OFFSET: u64 = 8192;

/// 128-bit content digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest(pub u128);

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        format!("{:032x}", self.0)
    }
}

/// Digest a file, sampling when it is larger than [`SAMPLE_THRESHOLD`]
pub fn content_digest(path: &Path) -> io::Result<ContentDigest> {
    let size = path.metadata()?.len();
    if size > SAMPLE_THRESHOLD {
        sampled_digest(path, size)
    } else {
        full_digest(path)
    }
}

/// Stream the whole file through xxh3-128 in 64 KiB blocks
pub fn full_digest(path: &Path) -> io::Result<ContentDigest> {
    let mut reader = BufReader::with_capacity(BLOCK_SIZE, File::open(path)?);
    let mut hasher = Xxh3::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(ContentDigest(hasher.digest128()))
}

/// Digest 4 KiB at offsets 0, size/2 and size-8192, then the decimal size
pub fn sampled_digest(path: &Path, size: u64) -> io::Result<ContentDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; SAMPLE_SIZE];

    for offset in [0, size / 2, size.saturating_sub(TAIL_OFFSET)] {
        file.seek(SeekFrom::Start(offset))?;
        let read = read_up_to(&mut file, &mut buffer)?;
        hasher.update(&buffer[..read]);
    }
    hasher.update(size.to_string().as_bytes());

    Ok(ContentDigest(hasher.digest128()))
}

fn read_up_to(file: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}
