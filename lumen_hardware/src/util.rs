use crate::error::{HwError, Result};

/// Call `op` until it succeeds, fails with something other than a timeout, or
/// `max_retries` timeouts have been retried.
pub fn retry_on_timeout<T>(max_retries: u32, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut retries = 0;
    loop {
        match op() {
            Err(HwError::Timeout) if retries < max_retries => {
                retries += 1;
                tracing::warn!(retries, "sensor timeout, retrying");
            }
            other => return other,
        }
    }
}
