// Core modules implementing pool mapping, carve-out accounting, durable
// appends, and error modeling.
pub mod error;
pub mod membuf;
pub mod pmem;
pub mod pool;
