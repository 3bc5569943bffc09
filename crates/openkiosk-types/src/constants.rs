//! System-wide constants for the OpenKiosk settlement engine.

/// Fee basis-point scale: 10000 = 100%.
pub const BASIS_POINTS: u64 = 10_000;

/// Default marketplace base fee: 200 bps = 2%.
pub const DEFAULT_BASE_FEE_BPS: u16 = 200;

/// Maximum admissible fee rate (100%).
pub const MAX_FEE_BPS: u16 = 10_000;

/// Maximum events retained in the marketplace's in-memory log before the
/// oldest are dropped. Events are fire-and-forget, so dropping is safe.
pub const MAX_EVENT_LOG: usize = 10_000;
