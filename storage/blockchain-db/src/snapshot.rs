//! Generic whole-file snapshot persistence, used for `blockchainindices.dat`
//! (secondary indexes) and `poolstate.bin` (mempool) alike: both are just
//! "serialize the whole in-memory structure, write it atomically, read it
//! back on startup" with no need for the paged store's random access.

use std::fs;
use std::io::Write;
use std::path::Path;

use cryptonote_serialization::binary::{Decode, Encode};

use crate::error::{Result, StorageError};

const SNAPSHOT_VERSION: u8 = 1;

/// Writes `value`'s encoding to `path`, via a temporary file renamed into
/// place so a crash mid-write cannot leave a half-written snapshot.
pub fn save<T: Encode>(path: &Path, value: &T) -> Result<()> {
    let mut bytes = vec![SNAPSHOT_VERSION];
    value.encode(&mut bytes);

    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Reads a value previously written with [`save`]. Returns `Ok(None)` if
/// `path` does not exist (a fresh data directory), since a missing snapshot
/// is not itself evidence of corruption.
pub fn load<T: Decode>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let Some((&version, rest)) = bytes.split_first() else {
        return Err(StorageError::Corrupt("empty snapshot file".to_owned()));
    };
    if version != SNAPSHOT_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported snapshot version {version}"
        )));
    }

    cryptonote_serialization::binary::from_slice(rest)
        .map(Some)
        .map_err(|e| StorageError::Corrupt(format!("snapshot failed to decode: {e}")))
}
