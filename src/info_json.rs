//! Purpose: JSON envelope for `nvmite info --json` and `create --json`.
//! Exports: `pool_info_json`.
//! Role: Keep operator-tooling output shape in one place.
//! Invariants: Stable key names for the v0 info payload.

use nvmite::core::pool::PoolInfo;
use serde_json::{json, Value};

pub(crate) fn pool_info_json(info: &PoolInfo) -> Value {
    let carve_span = info.capacity.saturating_sub(info.log_cap);
    let used_percent = if carve_span == 0 {
        0.0
    } else {
        (info.live_bytes as f64 / carve_span as f64) * 100.0
    };
    json!({
        "pool": info,
        "utilization": {
            "carve_span_bytes": carve_span,
            "used_bytes": info.live_bytes,
            "reclaimed_bytes": info.free_bytes,
            "unallocated_bytes": info.capacity.saturating_sub(info.cursor),
            "used_percent": used_percent,
        },
    })
}
