//! System-wide constants for SplitLedger.

/// Default currency symbol for new groups.
pub const DEFAULT_CURRENCY_SYMBOL: &str = "HBAR";

/// Default number of decimal places between the display unit and the
/// smallest unit (1 HBAR = 10^8 tinybars).
pub const DEFAULT_CURRENCY_DECIMALS: u32 = 8;

/// Largest supported `decimals` value. `10^28` is the biggest power of ten
/// `rust_decimal` can represent exactly.
pub const MAX_CURRENCY_DECIMALS: u32 = 28;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "SplitLedger";
