//! Abstraction over the external key-value store the persistence façade
//! builds on. The store itself (on-chip flash, a real NVS partition) is an
//! external collaborator; only the façade that talks to it belongs here.

use heapless::{FnvIndexMap, String};

use crate::error::{GarageError, Result};

/// Maximum byte length of a stored key, chosen to comfortably fit the fixed
/// key set the persistence façade uses (`reed_closed`, `evt_###` etc.).
pub const MAX_KEY_LEN: usize = 16;

/// Maximum byte length of a stored blob value (the event-log wire format is
/// 12 bytes; this leaves headroom without inviting unbounded entries).
pub const MAX_BLOB_LEN: usize = 16;

/// Opaque, transactional key-value store the persistence façade is built
/// on top of. A real board backs this with a flash page allocator or an
/// NVS partition; `RamKvStore` below is the in-memory stand-in used by
/// host tests and as a firmware fallback until flash storage is wired up.
pub trait KvStore {
    fn get_u32(&self, key: &str) -> Result<u32>;
    fn set_u32(&mut self, key: &str, value: u32) -> Result<()>;
    fn get_blob(&self, key: &str, out: &mut [u8]) -> Result<usize>;
    fn set_blob(&mut self, key: &str, data: &[u8]) -> Result<()>;
    /// Makes prior `set_*` calls durable. A no-op for `RamKvStore`; a real
    /// backing store would flush its write buffer to flash here.
    fn commit(&mut self) -> Result<()>;
    fn erase_all(&mut self) -> Result<()>;
}

#[derive(Clone, Copy)]
enum Slot {
    U32(u32),
    Blob([u8; MAX_BLOB_LEN], usize),
}

/// Fixed-capacity in-memory `KvStore`, used by host tests and by firmware
/// builds that have not yet wired up a flash-backed implementation.
pub struct RamKvStore<const N: usize> {
    map: FnvIndexMap<String<MAX_KEY_LEN>, Slot, N>,
}

impl<const N: usize> RamKvStore<N> {
    pub fn new() -> Self {
        RamKvStore { map: FnvIndexMap::new() }
    }

    fn key(key: &str) -> Result<String<MAX_KEY_LEN>> {
        let mut s = String::new();
        s.push_str(key).map_err(|_| GarageError::InvalidArgument)?;
        Ok(s)
    }
}

impl<const N: usize> Default for RamKvStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> KvStore for RamKvStore<N> {
    fn get_u32(&self, key: &str) -> Result<u32> {
        match self.map.get(key) {
            Some(Slot::U32(value)) => Ok(*value),
            Some(Slot::Blob(_, _)) => Err(GarageError::IoError),
            None => Err(GarageError::NotFound),
        }
    }

    fn set_u32(&mut self, key: &str, value: u32) -> Result<()> {
        let k = Self::key(key)?;
        self.map
            .insert(k, Slot::U32(value))
            .map_err(|_| GarageError::OutOfMemory)?;
        Ok(())
    }

    fn get_blob(&self, key: &str, out: &mut [u8]) -> Result<usize> {
        match self.map.get(key) {
            Some(Slot::Blob(data, len)) => {
                if *len > out.len() {
                    return Err(GarageError::InvalidArgument);
                }
                out[..*len].copy_from_slice(&data[..*len]);
                Ok(*len)
            }
            Some(Slot::U32(_)) => Err(GarageError::IoError),
            None => Err(GarageError::NotFound),
        }
    }

    fn set_blob(&mut self, key: &str, data: &[u8]) -> Result<()> {
        if data.len() > MAX_BLOB_LEN {
            return Err(GarageError::InvalidArgument);
        }
        let mut buf = [0u8; MAX_BLOB_LEN];
        buf[..data.len()].copy_from_slice(data);
        let k = Self::key(key)?;
        self.map
            .insert(k, Slot::Blob(buf, data.len()))
            .map_err(|_| GarageError::OutOfMemory)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn erase_all(&mut self) -> Result<()> {
        self.map.clear();
        Ok(())
    }
}
