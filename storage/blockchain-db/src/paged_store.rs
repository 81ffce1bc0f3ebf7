//! A random-access, append-only sequence of records backed by two files: an
//! *items* file holding concatenated encoded records, and an *index* file
//! holding a record count and a per-record size prefix. An in-memory LRU
//! cache sits above the pair so repeated access to recent records avoids a
//! re-decode.
//!
//! Grounded directly in the reference `BlockAccessor<T>`: same two-file
//! split, same "index write is the commit point, the items file's logical
//! tail may dangle until the next append" semantics for `pop_back`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use cryptonote_serialization::binary::{Decode, Encode};
use indexmap::IndexMap;

use crate::error::{Result, StorageError};

const INDEX_FILE_VERSION: u8 = 1;

/// An append-only, randomly-indexable sequence of `T` with an LRU decode
/// cache.
pub struct PagedStore<T> {
    items_file: File,
    index_file: File,
    /// Size, in bytes, of each record; `sizes.len()` is the store's length.
    sizes: Vec<u32>,
    cache: IndexMap<usize, Arc<T>>,
    pool_size: usize,
}

impl<T: Encode + Decode> PagedStore<T> {
    /// Opens (creating if necessary) a paged store at `items_path` /
    /// `index_path`, validating the index against the items file's length.
    pub fn open(items_path: &Path, index_path: &Path, pool_size: usize) -> Result<Self> {
        let mut items_file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(items_path)?;
        let mut index_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(index_path)?;

        let sizes = read_index(&mut index_file)?;

        let logical_len: u64 = sizes.iter().map(|&s| u64::from(s)).sum();
        let items_len = items_file.seek(SeekFrom::End(0))?;
        if logical_len > items_len {
            return Err(StorageError::Corrupt(format!(
                "index claims {logical_len} bytes of records but items file is only {items_len} bytes"
            )));
        }

        Ok(Self {
            items_file,
            index_file,
            sizes,
            cache: IndexMap::new(),
            pool_size: pool_size.max(1),
        })
    }

    /// Number of records currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        self.sizes.len()
    }

    /// `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    fn offset_of(&self, index: usize) -> u64 {
        self.sizes[..index].iter().map(|&s| u64::from(s)).sum()
    }

    fn logical_end(&self) -> u64 {
        self.offset_of(self.sizes.len())
    }

    /// Appends `value` as the new last record.
    pub fn push_back(&mut self, value: &T) -> Result<()> {
        let bytes = cryptonote_serialization::binary::to_vec(value);
        let size: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| StorageError::Corrupt("record exceeds u32::MAX bytes".to_owned()))?;

        let offset = self.logical_end();
        self.items_file.seek(SeekFrom::Start(offset))?;
        self.items_file.write_all(&bytes)?;
        self.items_file.flush()?;

        self.sizes.push(size);
        write_index(&mut self.index_file, &self.sizes)?;

        let index = self.sizes.len() - 1;
        self.cache.insert(index, Arc::new(value_from_bytes(value)));
        self.evict_if_needed();
        Ok(())
    }

    /// Removes the last record. The index file is updated immediately (the
    /// commit point); the items file's now-unused tail is reclaimed lazily
    /// by the next `push_back`.
    pub fn pop_back(&mut self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(StorageError::Corrupt("pop_back on empty store".to_owned()));
        }
        let removed_index = self.sizes.len() - 1;
        self.sizes.pop();
        write_index(&mut self.index_file, &self.sizes)?;
        self.cache.shift_remove(&removed_index);
        Ok(())
    }

    /// Returns the record at `index`, decoding and caching it on a miss.
    pub fn get(&mut self, index: usize) -> Result<Arc<T>> {
        if index >= self.sizes.len() {
            return Err(StorageError::Corrupt(format!(
                "index {index} out of bounds ({})",
                self.sizes.len()
            )));
        }

        if let Some(value) = self.cache.get(&index) {
            let value = Arc::clone(value);
            self.cache.shift_remove(&index);
            self.cache.insert(index, Arc::clone(&value));
            return Ok(value);
        }

        let offset = self.offset_of(index);
        let size = self.sizes[index] as usize;
        let mut buf = vec![0u8; size];
        self.items_file.seek(SeekFrom::Start(offset))?;
        self.items_file.read_exact(&mut buf)?;

        let value = cryptonote_serialization::binary::from_slice::<T>(&buf).map_err(|e| {
            StorageError::Corrupt(format!("record {index} failed to decode: {e}"))
        })?;
        let value = Arc::new(value);
        self.cache.insert(index, Arc::clone(&value));
        self.evict_if_needed();
        Ok(value)
    }

    /// Returns the first record, if any.
    pub fn front(&mut self) -> Result<Arc<T>> {
        self.get(0)
    }

    /// Returns the last record, if any.
    pub fn back(&mut self) -> Result<Arc<T>> {
        self.get(self.sizes.len() - 1)
    }

    fn evict_if_needed(&mut self) {
        while self.cache.len() > self.pool_size {
            self.cache.shift_remove_index(0);
        }
    }
}

/// Clones a value through its own encoding, used to seed the cache with an
/// owned copy right after a `push_back` without requiring `T: Clone`.
fn value_from_bytes<T: Encode + Decode>(value: &T) -> T {
    let bytes = cryptonote_serialization::binary::to_vec(value);
    cryptonote_serialization::binary::from_slice(&bytes)
        .expect("value we just encoded must decode")
}

fn read_index(index_file: &mut File) -> Result<Vec<u32>> {
    let len = index_file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(Vec::new());
    }
    index_file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::with_capacity(len as usize);
    index_file.read_to_end(&mut bytes)?;

    let mut slice = bytes.as_slice();
    if slice.is_empty() {
        return Ok(Vec::new());
    }
    let version = slice[0];
    if version != INDEX_FILE_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported index file version {version}"
        )));
    }
    slice = &slice[1..];

    if slice.len() < 8 {
        return Err(StorageError::Corrupt("index file truncated".to_owned()));
    }
    let count = u64::from_le_bytes(slice[..8].try_into().unwrap());
    slice = &slice[8..];

    if slice.len() as u64 != count * 4 {
        return Err(StorageError::Corrupt(
            "index file size prefix count disagrees with file length".to_owned(),
        ));
    }

    let mut sizes = Vec::with_capacity(count as usize);
    for chunk in slice.chunks_exact(4) {
        sizes.push(u32::from_le_bytes(chunk.try_into().unwrap()));
    }
    Ok(sizes)
}

fn write_index(index_file: &mut File, sizes: &[u32]) -> Result<()> {
    let mut bytes = Vec::with_capacity(1 + 8 + sizes.len() * 4);
    bytes.push(INDEX_FILE_VERSION);
    bytes.extend_from_slice(&(sizes.len() as u64).to_le_bytes());
    for size in sizes {
        bytes.extend_from_slice(&size.to_le_bytes());
    }

    index_file.set_len(0)?;
    index_file.seek(SeekFrom::Start(0))?;
    index_file.write_all(&bytes)?;
    index_file.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_get_and_pop_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.dat");
        let index = dir.path().join("index.dat");

        let mut store = PagedStore::<u64>::open(&items, &index, 2).unwrap();
        assert!(store.is_empty());

        for v in [10u64, 20, 30] {
            store.push_back(&v).unwrap();
        }
        assert_eq!(store.size(), 3);
        assert_eq!(*store.get(0).unwrap(), 10);
        assert_eq!(*store.back().unwrap(), 30);

        store.pop_back().unwrap();
        assert_eq!(store.size(), 2);
        assert_eq!(*store.back().unwrap(), 20);
    }

    #[test]
    fn reopening_reconstructs_state() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.dat");
        let index = dir.path().join("index.dat");

        {
            let mut store = PagedStore::<u64>::open(&items, &index, 4).unwrap();
            store.push_back(&1).unwrap();
            store.push_back(&2).unwrap();
        }

        let mut reopened = PagedStore::<u64>::open(&items, &index, 4).unwrap();
        assert_eq!(reopened.size(), 2);
        assert_eq!(*reopened.get(1).unwrap(), 2);
    }

    #[test]
    fn cache_evicts_beyond_pool_size() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.dat");
        let index = dir.path().join("index.dat");

        let mut store = PagedStore::<u64>::open(&items, &index, 1).unwrap();
        store.push_back(&1).unwrap();
        store.push_back(&2).unwrap();
        // Cache capacity is 1: after pushing `2`, `0` must have been evicted
        // from the cache, but it is still retrievable from disk.
        assert_eq!(store.cache.len(), 1);
        assert_eq!(*store.get(0).unwrap(), 1);
    }
}
