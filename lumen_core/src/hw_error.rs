//! Maps `Box<dyn Error>` from trait boundaries to typed `LumenError`.
//!
//! The traits in `lumen_traits` return boxed errors; this module converts
//! those to our typed error enum, with an optional feature-gated path for
//! `lumen_hardware::HwError` downcasting.

use crate::error::LumenError;

/// Map a trait-boundary error to a typed `LumenError`.
///
/// Known hardware error types are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LumenError {
    #[cfg(feature = "hardware-errors")]
    {
        use lumen_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => LumenError::Timeout,
                other => LumenError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LumenError::Timeout
    } else {
        LumenError::Hardware(s)
    }
}
