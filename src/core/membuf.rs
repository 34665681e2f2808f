// Durable append buffer handle over one carved-out range of the pool.
//
// A handle is owned by exactly one writer at a time; `insert` takes `&mut
// self` so two threads cannot race on the cursor. Bytes below the cursor are
// durable and immutable, bytes at or above it are unspecified until written.
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::pool::MapRegion;

#[derive(Debug)]
pub struct Membuf {
    region: Arc<MapRegion>,
    base: u64,
    size: u64,
    cursor: u64,
}

impl Membuf {
    pub(crate) fn new(region: Arc<MapRegion>, base: u64, size: u64) -> Self {
        Self {
            region,
            base,
            size,
            cursor: 0,
        }
    }

    /// Append `bytes` at the write cursor and flush them to the backing
    /// store. Returns the absolute pool offset where the data begins.
    ///
    /// When this returns `Ok`, the bytes are durable. A write never spans two
    /// carve-outs: if `bytes` does not fit in the remaining space the call
    /// fails with `Capacity` and the cursor is left untouched, so the caller
    /// can finalize this buffer and roll to a fresh one.
    pub fn insert(&mut self, bytes: &[u8]) -> Result<u64, Error> {
        if bytes.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("insert of zero bytes"));
        }
        let len = bytes.len() as u64;
        if len > self.remaining() {
            return Err(Error::new(ErrorKind::Capacity)
                .with_message("append buffer full")
                .with_offset(self.base + self.cursor));
        }
        let offset = self.base + self.cursor;
        // Safety: this handle is the only writer for its carve-out, and the
        // target range was just bounds-checked against the durable prefix.
        unsafe { self.region.write_at(offset as usize, bytes) };
        self.region.persist(offset as usize, bytes.len()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("flush of appended bytes failed")
                .with_offset(offset)
                .with_source(err)
        })?;
        self.cursor += len;
        Ok(offset)
    }

    /// Recovery-only: move the write cursor to a replay-verified byte
    /// position without writing anything.
    pub fn set_cursor(&mut self, index: u64) -> Result<(), Error> {
        self.seek(index)
    }

    /// Recovery-only: same as `set_cursor`, taking the position as the
    /// durable byte count tracked by the replay scan. The two views must
    /// land on the same position.
    pub fn set_counter(&mut self, counter: u64) -> Result<(), Error> {
        self.seek(counter)
    }

    fn seek(&mut self, position: u64) -> Result<(), Error> {
        if position > self.size {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("cursor beyond buffer size")
                .with_offset(position));
        }
        self.cursor = position;
        Ok(())
    }

    /// Current write cursor, i.e. bytes appended so far.
    pub fn counter(&self) -> u64 {
        self.cursor
    }

    /// Absolute pool offset of this carve-out's first byte.
    pub fn base_address(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn remaining(&self) -> u64 {
        self.size - self.cursor
    }

    pub fn is_full(&self) -> bool {
        self.cursor == self.size
    }

    /// Read-only view of the durable prefix, for log replay.
    pub fn durable_bytes(&self) -> &[u8] {
        // Safety: [base, base + cursor) is immutable once the insert that
        // covered it returned.
        unsafe { self.region.slice(self.base as usize, self.cursor as usize) }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::error::ErrorKind;
    use crate::core::pool::{Pool, PoolOptions};

    const KIB: u64 = 1024;

    fn scratch_pool(size: u64) -> (tempfile::TempDir, Pool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        let pool = Pool::open(&path, PoolOptions::new(size).with_log_cap(0)).expect("open pool");
        (dir, pool)
    }

    #[test]
    fn insert_addresses_accumulate() {
        let (_dir, pool) = scratch_pool(1024 * KIB);
        let mut buf = pool.allocate(64 * KIB).expect("allocate");

        let first = buf.insert(&[1u8; 100]).expect("insert");
        let second = buf.insert(&[2u8; 200]).expect("insert");
        let third = buf.insert(&[3u8; 300]).expect("insert");

        assert_eq!(first, buf.base_address());
        assert_eq!(second, buf.base_address() + 100);
        assert_eq!(third, buf.base_address() + 300);
        assert_eq!(buf.counter(), 600);
        assert_eq!(buf.remaining(), 64 * KIB - 600);
    }

    #[test]
    fn overflowing_insert_fails_and_leaves_cursor() {
        let (_dir, pool) = scratch_pool(1024 * KIB);
        let mut buf = pool.allocate(256 * KIB).expect("allocate");

        buf.insert(&vec![0xAB; 100 * KIB as usize]).expect("first 100 KiB");
        buf.insert(&vec![0xCD; 100 * KIB as usize]).expect("second 100 KiB");
        assert_eq!(buf.remaining(), 56 * KIB);

        let err = buf
            .insert(&vec![0xEF; 100 * KIB as usize])
            .expect_err("third insert must not fit");
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert_eq!(buf.counter(), 200 * KIB);
        assert_eq!(buf.remaining(), 56 * KIB);
    }

    #[test]
    fn buffer_fills_to_exact_capacity() {
        let (_dir, pool) = scratch_pool(64 * KIB);
        let mut buf = pool.allocate(4 * KIB).expect("allocate");

        buf.insert(&vec![7u8; 4 * KIB as usize]).expect("exact fit");
        assert!(buf.is_full());
        assert_eq!(buf.remaining(), 0);

        let err = buf.insert(&[7u8]).expect_err("full buffer");
        assert_eq!(err.kind(), ErrorKind::Capacity);
    }

    #[test]
    fn empty_insert_is_a_usage_error() {
        let (_dir, pool) = scratch_pool(64 * KIB);
        let mut buf = pool.allocate(4 * KIB).expect("allocate");
        let err = buf.insert(&[]).expect_err("empty insert");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn cursor_mutators_are_bounds_checked() {
        let (_dir, pool) = scratch_pool(64 * KIB);
        let mut buf = pool.allocate(4 * KIB).expect("allocate");

        buf.set_cursor(1000).expect("within bounds");
        assert_eq!(buf.counter(), 1000);

        buf.set_counter(4 * KIB).expect("at capacity");
        assert!(buf.is_full());

        let err = buf.set_cursor(4 * KIB + 1).expect_err("beyond capacity");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(buf.counter(), 4 * KIB);
    }

    #[test]
    fn recovered_cursor_resumes_appends() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        let options = PoolOptions::new(64 * KIB).with_log_cap(0);

        let resume = {
            let pool = Pool::open(&path, options).expect("open pool");
            let mut buf = pool.allocate(4 * KIB).expect("allocate");
            buf.insert(b"first record").expect("insert");
            buf.counter()
        };

        let pool = Pool::open(&path, options).expect("reopen pool");
        let mut rebuilt = pool.reallocate(0, 4 * KIB).expect("reallocate");
        rebuilt.set_cursor(resume).expect("set cursor");
        let addr = rebuilt.insert(b"second record").expect("insert resumes");
        assert_eq!(addr, resume);
        assert_eq!(rebuilt.durable_bytes(), b"first recordsecond record");
    }

    #[test]
    fn durable_bytes_reflect_appends() {
        let (_dir, pool) = scratch_pool(64 * KIB);
        let mut buf = pool.allocate(4 * KIB).expect("allocate");

        assert!(buf.durable_bytes().is_empty());
        buf.insert(b"hello ").expect("insert");
        buf.insert(b"world").expect("insert");
        assert_eq!(buf.durable_bytes(), b"hello world");
    }
}
