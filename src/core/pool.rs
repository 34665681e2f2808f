// Pool file mapping, carve-out bookkeeping, and recovery reconstruction.
//
// The allocator is a bump cursor over the region past the log reservation,
// fronted by a first-fit free list of reclaimed ranges. Bookkeeping lives
// behind one mutex; critical sections touch only in-memory state, never the
// mapping and never a flush.
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use memmap2::MmapMut;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::membuf::Membuf;
use crate::core::pmem;

const MIB: u64 = 1024 * 1024;

pub const DEFAULT_POOL_SIZE: u64 = 1024 * MIB;
pub const DEFAULT_LOG_CAP: u64 = 30 * MIB;
pub const DEFAULT_MEMBUF_CAP: u64 = 30 * MIB;

/// Shared view of the mapped region. The pool and every buffer handle hold
/// it through an `Arc`, so the mapping outlives all handles regardless of
/// drop order.
#[derive(Debug)]
pub(crate) struct MapRegion {
    map: MmapMut,
    base: *mut u8,
}

// Safety: carve-outs are disjoint sub-ranges, each written through exactly
// one `Membuf` at a time, and reads target only durable prefixes. No byte is
// ever reachable for write from two threads.
unsafe impl Send for MapRegion {}
unsafe impl Sync for MapRegion {}

impl MapRegion {
    fn new(mut map: MmapMut) -> Self {
        let base = map.as_mut_ptr();
        Self { map, base }
    }

    /// Store `bytes` at `offset`.
    ///
    /// Safety: the caller must be the only writer for a carve-out containing
    /// `[offset, offset + bytes.len())`.
    pub(crate) unsafe fn write_at(&self, offset: usize, bytes: &[u8]) {
        debug_assert!(offset + bytes.len() <= self.map.len());
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.base.add(offset), bytes.len());
        }
    }

    /// Read-only view of `[offset, offset + len)`.
    ///
    /// Safety: the range must already be durable, so no writer can touch it.
    pub(crate) unsafe fn slice(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= self.map.len());
        unsafe { std::slice::from_raw_parts(self.base.add(offset).cast_const(), len) }
    }

    /// Flush `[offset, offset + len)` to the backing store.
    pub(crate) fn persist(&self, offset: usize, len: usize) -> io::Result<()> {
        self.map.flush_range(offset, len)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PoolOptions {
    pub size: u64,
    pub log_cap: u64,
    pub strict_pmem: bool,
}

impl PoolOptions {
    pub fn new(size: u64) -> Self {
        Self {
            size,
            log_cap: DEFAULT_LOG_CAP,
            strict_pmem: false,
        }
    }

    pub fn with_log_cap(mut self, log_cap: u64) -> Self {
        self.log_cap = log_cap;
        self
    }

    pub fn with_strict_pmem(mut self, strict: bool) -> Self {
        self.strict_pmem = strict;
        self
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct FreeRange {
    offset: u64,
    size: u64,
}

#[derive(Debug)]
struct AllocState {
    cursor: u64,
    live: BTreeMap<u64, u64>,
    free: Vec<FreeRange>,
}

#[derive(Debug)]
pub struct Pool {
    path: PathBuf,
    file: File,
    region: Arc<MapRegion>,
    cap: u64,
    log_cap: u64,
    state: Mutex<AllocState>,
}

impl Pool {
    /// Map or create the backing file at `options.size` bytes and reserve
    /// `options.log_cap` bytes at the head for log-only use.
    ///
    /// Existing bytes are never truncated or re-zeroed; a shorter existing
    /// file is grown in place, a longer one is rejected. The file is held
    /// under an exclusive advisory lock for the lifetime of the pool.
    pub fn open(path: impl AsRef<Path>, options: PoolOptions) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if options.size == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("pool size must be non-zero"));
        }
        if options.log_cap >= options.size {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("log reservation must be smaller than the pool"));
        }
        if options.strict_pmem && !pmem::path_is_dax(&path)? {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("path is not backed by a DAX-capable mount")
                .with_path(&path));
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;

        file.try_lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&path)
                .with_source(err)
        })?;

        let existing = file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;
        if existing > options.size {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("existing pool file is larger than the requested size")
                .with_path(&path));
        }
        if existing < options.size {
            file.set_len(options.size)
                .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?;
        }

        let map = unsafe {
            MmapMut::map_mut(&file)
                .map_err(|err| Error::new(ErrorKind::Io).with_path(&path).with_source(err))?
        };

        debug!(
            path = %path.display(),
            size = options.size,
            log_cap = options.log_cap,
            "pool mapped"
        );

        Ok(Self {
            path,
            file,
            region: Arc::new(MapRegion::new(map)),
            cap: options.size,
            log_cap: options.log_cap,
            state: Mutex::new(AllocState {
                cursor: options.log_cap,
                live: BTreeMap::new(),
                free: Vec::new(),
            }),
        })
    }

    /// Carve a fresh contiguous range of `capacity` bytes and return a
    /// buffer handle over it.
    ///
    /// Reclaimed ranges are reused first-fit (an oversized range is split
    /// from its head); otherwise the bump cursor is extended. Fails with
    /// `Capacity` when neither fits.
    pub fn allocate(&self, capacity: u64) -> Result<Membuf, Error> {
        if capacity == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("capacity must be non-zero"));
        }
        let mut state = self.lock_state()?;

        if let Some(idx) = state.free.iter().position(|range| range.size >= capacity) {
            let range = state.free[idx];
            if range.size == capacity {
                state.free.remove(idx);
            } else {
                state.free[idx] = FreeRange {
                    offset: range.offset + capacity,
                    size: range.size - capacity,
                };
            }
            state.live.insert(range.offset, capacity);
            debug!(offset = range.offset, capacity, "carve reused from free list");
            return Ok(self.handle(range.offset, capacity));
        }

        let offset = state.cursor;
        let end = offset.checked_add(capacity).filter(|end| *end <= self.cap);
        let Some(end) = end else {
            return Err(Error::new(ErrorKind::Capacity)
                .with_message("pool exhausted")
                .with_offset(offset));
        };
        state.cursor = end;
        state.live.insert(offset, capacity);
        debug!(offset, capacity, "carve allocated at bump cursor");
        Ok(self.handle(offset, capacity))
    }

    /// Recovery-only: rebuild a buffer handle over an already-existing range
    /// without moving the bump cursor.
    ///
    /// The range is registered in the live map so a later `free` accepts it
    /// and so duplicate descriptors are caught.
    pub fn reallocate(&self, offset: u64, capacity: u64) -> Result<Membuf, Error> {
        if capacity == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("capacity must be non-zero"));
        }
        let in_bounds = offset >= self.log_cap
            && offset
                .checked_add(capacity)
                .is_some_and(|end| end <= self.cap);
        if !in_bounds {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("range lies outside the carve-out region")
                .with_offset(offset));
        }
        let mut state = self.lock_state()?;
        if overlaps(&state.live, offset, capacity) {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("range overlaps a live carve-out")
                .with_offset(offset));
        }
        if state
            .free
            .iter()
            .any(|range| ranges_intersect(range.offset, range.size, offset, capacity))
        {
            return Err(Error::new(ErrorKind::Corrupt)
                .with_message("range overlaps a reclaimed range")
                .with_offset(offset));
        }
        state.live.insert(offset, capacity);
        debug!(offset, capacity, "carve reconstructed");
        Ok(self.handle(offset, capacity))
    }

    /// Release the live carve-out whose base is exactly `address` back to
    /// the free list. Freeing an unknown or already-freed address is a
    /// caller bug and fails without mutating any accounting.
    pub fn free(&self, address: u64) -> Result<(), Error> {
        let mut state = self.lock_state()?;
        let Some(size) = state.live.remove(&address) else {
            warn!(address, "free of unknown or already-freed address");
            return Err(Error::new(ErrorKind::Usage)
                .with_message("address is not the base of a live carve-out")
                .with_offset(address));
        };
        state.free.push(FreeRange {
            offset: address,
            size,
        });
        debug!(offset = address, size, "carve freed");
        Ok(())
    }

    /// Reconstruct every `(offset, size)` descriptor from a prior run and
    /// advance the bump cursor past the highest recovered end.
    ///
    /// Descriptors are validated as a whole before any state changes; a bad
    /// one aborts the recovery with `Corrupt` and leaves the pool untouched.
    /// Gaps between recovered ranges were freed in the prior run and return
    /// to the free list.
    pub fn recover(&self, records: &[(u64, u64)]) -> Result<Vec<Membuf>, Error> {
        let mut state = self.lock_state()?;
        if !state.live.is_empty() || state.cursor != self.log_cap {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("recover requires a freshly opened pool"));
        }

        let mut staged: BTreeMap<u64, u64> = BTreeMap::new();
        for &(offset, size) in records {
            if size == 0 {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("zero-sized recovery descriptor")
                    .with_offset(offset));
            }
            let in_bounds = offset >= self.log_cap
                && offset.checked_add(size).is_some_and(|end| end <= self.cap);
            if !in_bounds {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("recovery descriptor outside pool bounds")
                    .with_offset(offset));
            }
            if overlaps(&staged, offset, size) {
                return Err(Error::new(ErrorKind::Corrupt)
                    .with_message("recovery descriptors overlap")
                    .with_offset(offset));
            }
            staged.insert(offset, size);
        }

        let cursor = staged
            .iter()
            .map(|(offset, size)| offset + size)
            .max()
            .unwrap_or(self.log_cap);

        let mut free = Vec::new();
        let mut prev_end = self.log_cap;
        for (&offset, &size) in &staged {
            if offset > prev_end {
                free.push(FreeRange {
                    offset: prev_end,
                    size: offset - prev_end,
                });
            }
            prev_end = offset + size;
        }

        let handles = records
            .iter()
            .map(|&(offset, size)| self.handle(offset, size))
            .collect();
        state.live = staged;
        state.free = free;
        state.cursor = cursor;
        debug!(records = records.len(), cursor, "pool recovered");
        Ok(handles)
    }

    /// Buffer handle over the log reservation `[0, log_cap)`. The range is
    /// permanent: it is not part of the live map and cannot be freed.
    pub fn log_buffer(&self) -> Result<Membuf, Error> {
        if self.log_cap == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("pool has no log reservation"));
        }
        Ok(self.handle(0, self.log_cap))
    }

    /// Diagnostics snapshot; no durability or correctness obligation.
    pub fn info(&self) -> Result<PoolInfo, Error> {
        let state = self.lock_state()?;
        Ok(PoolInfo {
            path: self.path.clone(),
            capacity: self.cap,
            log_cap: self.log_cap,
            cursor: state.cursor,
            live_carves: state.live.len() as u64,
            live_bytes: state.live.values().sum(),
            free_ranges: state.free.len() as u64,
            free_bytes: state.free.iter().map(|range| range.size).sum(),
        })
    }

    pub fn capacity(&self) -> u64 {
        self.cap
    }

    pub fn log_cap(&self) -> u64 {
        self.log_cap
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn handle(&self, offset: u64, size: u64) -> Membuf {
        Membuf::new(Arc::clone(&self.region), offset, size)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, AllocState>, Error> {
        self.state
            .lock()
            .map_err(|_| Error::new(ErrorKind::Internal).with_message("allocator lock poisoned"))
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn overlaps(live: &BTreeMap<u64, u64>, offset: u64, size: u64) -> bool {
    let end = offset + size;
    if let Some((&prev_offset, &prev_size)) = live.range(..=offset).next_back() {
        if prev_offset + prev_size > offset {
            return true;
        }
    }
    live.range(offset..end).next().is_some()
}

fn ranges_intersect(a_offset: u64, a_size: u64, b_offset: u64, b_size: u64) -> bool {
    a_offset < b_offset + b_size && b_offset < a_offset + a_size
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PoolInfo {
    pub path: PathBuf,
    pub capacity: u64,
    pub log_cap: u64,
    pub cursor: u64,
    pub live_carves: u64,
    pub live_bytes: u64,
    pub free_ranges: u64,
    pub free_bytes: u64,
}

impl fmt::Display for PoolInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pool {}: capacity {}, log {}, cursor {}, live {} carves ({}), free {} ranges ({})",
            self.path.display(),
            humanize_bytes(self.capacity),
            humanize_bytes(self.log_cap),
            self.cursor,
            self.live_carves,
            humanize_bytes(self.live_bytes),
            self.free_ranges,
            humanize_bytes(self.free_bytes),
        )
    }
}

fn humanize_bytes(value: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let v = value as f64;
    if v >= GB {
        format!("{:.1}GiB", v / GB)
    } else if v >= MB {
        format!("{:.1}MiB", v / MB)
    } else if v >= KB {
        format!("{:.1}KiB", v / KB)
    } else {
        format!("{value}B")
    }
}

#[cfg(test)]
mod tests {
    use super::{Pool, PoolOptions};
    use crate::core::error::ErrorKind;

    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    fn scratch(size: u64, log_cap: u64) -> (tempfile::TempDir, Pool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        let pool =
            Pool::open(&path, PoolOptions::new(size).with_log_cap(log_cap)).expect("open pool");
        (dir, pool)
    }

    #[test]
    fn open_creates_backing_file_at_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        let pool = Pool::open(&path, PoolOptions::new(MIB).with_log_cap(0)).expect("open");
        assert_eq!(pool.capacity(), MIB);
        assert_eq!(std::fs::metadata(&path).expect("metadata").len(), MIB);
    }

    #[test]
    fn open_rejects_degenerate_options() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");

        let err = Pool::open(&path, PoolOptions::new(0)).expect_err("zero size");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = Pool::open(&path, PoolOptions::new(MIB).with_log_cap(MIB))
            .expect_err("log reservation swallows pool");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn open_rejects_oversized_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        drop(Pool::open(&path, PoolOptions::new(2 * MIB).with_log_cap(0)).expect("open"));

        let err = Pool::open(&path, PoolOptions::new(MIB).with_log_cap(0))
            .expect_err("shrinking would truncate durable bytes");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn second_open_is_rejected_while_locked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pool.nvm");
        let _pool = Pool::open(&path, PoolOptions::new(MIB).with_log_cap(0)).expect("open");

        let err = Pool::open(&path, PoolOptions::new(MIB).with_log_cap(0))
            .expect_err("pool is exclusively locked");
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn allocation_is_bump_ordered_and_bounded() {
        let (_dir, pool) = scratch(MIB, 0);

        let first = pool.allocate(256 * KIB).expect("first carve");
        assert_eq!(first.base_address(), 0);
        assert_eq!(first.size(), 256 * KIB);

        let second = pool.allocate(256 * KIB).expect("second carve");
        assert_eq!(second.base_address(), 256 * KIB);

        let err = pool.allocate(MIB).expect_err("pool exhausted");
        assert_eq!(err.kind(), ErrorKind::Capacity);

        // The failed allocate must not have moved the cursor.
        let third = pool.allocate(512 * KIB).expect("exact remainder");
        assert_eq!(third.base_address(), 512 * KIB);
    }

    #[test]
    fn log_reservation_is_not_carvable() {
        let (_dir, pool) = scratch(MIB, 64 * KIB);
        let buf = pool.allocate(128 * KIB).expect("carve");
        assert_eq!(buf.base_address(), 64 * KIB);

        let log = pool.log_buffer().expect("log buffer");
        assert_eq!(log.base_address(), 0);
        assert_eq!(log.size(), 64 * KIB);

        let err = pool.free(0).expect_err("log reservation is permanent");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn log_buffer_requires_a_reservation() {
        let (_dir, pool) = scratch(MIB, 0);
        let err = pool.log_buffer().expect_err("no reservation");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn zero_capacity_allocate_is_usage() {
        let (_dir, pool) = scratch(MIB, 0);
        let err = pool.allocate(0).expect_err("zero carve");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn freed_ranges_are_reused_first_fit() {
        let (_dir, pool) = scratch(MIB, 0);
        let first = pool.allocate(128 * KIB).expect("first");
        let _second = pool.allocate(128 * KIB).expect("second");

        pool.free(first.base_address()).expect("free first");

        // Splits the head off the reclaimed range.
        let small = pool.allocate(64 * KIB).expect("reuse head");
        assert_eq!(small.base_address(), 0);
        let rest = pool.allocate(64 * KIB).expect("reuse remainder");
        assert_eq!(rest.base_address(), 64 * KIB);

        // Nothing reclaimed fits; the bump cursor takes over.
        let fresh = pool.allocate(128 * KIB).expect("bump");
        assert_eq!(fresh.base_address(), 256 * KIB);
    }

    #[test]
    fn double_free_fails_without_mutating_accounting() {
        let (_dir, pool) = scratch(MIB, 0);
        let buf = pool.allocate(128 * KIB).expect("carve");
        pool.free(buf.base_address()).expect("free");

        let before = pool.info().expect("info");
        let err = pool.free(buf.base_address()).expect_err("double free");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = pool.free(77).expect_err("never allocated");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let after = pool.info().expect("info");
        assert_eq!(before.live_carves, after.live_carves);
        assert_eq!(before.free_bytes, after.free_bytes);
    }

    #[test]
    fn reallocate_validates_bounds_and_overlap() {
        let (_dir, pool) = scratch(MIB, 64 * KIB);

        let err = pool
            .reallocate(0, 32 * KIB)
            .expect_err("inside the log reservation");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = pool
            .reallocate(MIB - KIB, 2 * KIB)
            .expect_err("past the end of the pool");
        assert_eq!(err.kind(), ErrorKind::Usage);

        pool.reallocate(64 * KIB, 128 * KIB).expect("reconstruct");
        let err = pool
            .reallocate(128 * KIB, 128 * KIB)
            .expect_err("overlaps the reconstructed range");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
    }

    #[test]
    fn recover_rebuilds_handles_and_advances_cursor() {
        let (_dir, pool) = scratch(MIB, 0);
        let records = [(0, 128 * KIB), (128 * KIB, 128 * KIB)];

        let bufs = pool.recover(&records).expect("recover");
        assert_eq!(bufs.len(), 2);
        assert_eq!(bufs[0].base_address(), 0);
        assert_eq!(bufs[1].base_address(), 128 * KIB);

        let next = pool.allocate(128 * KIB).expect("allocate past recovered");
        assert_eq!(next.base_address(), 256 * KIB);
    }

    #[test]
    fn recover_restores_freed_gaps_to_the_free_list() {
        let (_dir, pool) = scratch(MIB, 0);
        // The range [0, 128 KiB) was freed in the prior run.
        let records = [(128 * KIB, 128 * KIB)];

        pool.recover(&records).expect("recover");
        let info = pool.info().expect("info");
        assert_eq!(info.free_bytes, 128 * KIB);

        let reused = pool.allocate(128 * KIB).expect("reuse the gap");
        assert_eq!(reused.base_address(), 0);
    }

    #[test]
    fn recover_aborts_on_inconsistent_descriptors() {
        let (_dir, pool) = scratch(MIB, 0);

        let err = pool
            .recover(&[(0, 128 * KIB), (64 * KIB, 128 * KIB)])
            .expect_err("overlapping descriptors");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let err = pool
            .recover(&[(MIB, 128 * KIB)])
            .expect_err("descriptor outside the pool");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        let err = pool.recover(&[(0, 0)]).expect_err("zero-sized descriptor");
        assert_eq!(err.kind(), ErrorKind::Corrupt);

        // Failed recoveries leave the pool untouched.
        let buf = pool.allocate(128 * KIB).expect("allocate");
        assert_eq!(buf.base_address(), 0);
    }

    #[test]
    fn recover_requires_a_fresh_pool() {
        let (_dir, pool) = scratch(MIB, 0);
        pool.allocate(128 * KIB).expect("allocate");

        let err = pool
            .recover(&[(512 * KIB, 128 * KIB)])
            .expect_err("pool already carved");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn info_reports_accounting() {
        let (_dir, pool) = scratch(MIB, 64 * KIB);
        let first = pool.allocate(128 * KIB).expect("first");
        let _second = pool.allocate(64 * KIB).expect("second");
        pool.free(first.base_address()).expect("free");

        let info = pool.info().expect("info");
        assert_eq!(info.capacity, MIB);
        assert_eq!(info.log_cap, 64 * KIB);
        assert_eq!(info.live_carves, 1);
        assert_eq!(info.live_bytes, 64 * KIB);
        assert_eq!(info.free_ranges, 1);
        assert_eq!(info.free_bytes, 128 * KIB);
        assert_eq!(info.cursor, 64 * KIB + 192 * KIB);

        let rendered = info.to_string();
        assert!(rendered.contains("1.0MiB"));
        assert!(rendered.contains("live 1 carves"));
    }

    #[test]
    fn humanize_bytes_picks_sane_units() {
        assert_eq!(super::humanize_bytes(512), "512B");
        assert_eq!(super::humanize_bytes(2 * KIB), "2.0KiB");
        assert_eq!(super::humanize_bytes(30 * MIB), "30.0MiB");
        assert_eq!(super::humanize_bytes(1024 * MIB), "1.0GiB");
    }
}
