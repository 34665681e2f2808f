//! Purpose: Persistent-memory arena allocator shared by the `nvmite` CLI and tests.
//! Exports: `core` (pool mapping, carve-out allocation, durable append buffers, errors).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Buffer handles never outlive the mapping they reference.
//! Invariants: Bytes below a buffer's write cursor are durable and immutable.
pub mod core;
