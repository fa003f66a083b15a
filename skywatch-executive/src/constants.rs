//! Constants for task timing and manager messages
//!
//! All durations are in milliseconds.

/// Multiplier applied to every reported or configured completion time.
pub const DEFAULT_FUDGE_FACTOR: f64 = 1.1;

/// Fixed allowance added on top of the scaled completion time.
pub const DEFAULT_PAD_MS: u64 = 10_000;

/// Attempts made by [`RetryPolicy::default`](crate::RetryPolicy) including the first run.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between retry attempts.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 5_000;

/// `sig_message` category sent on every acknowledgement.
pub const MESSAGE_ACK: i32 = 1;

/// Bounded wait for a command that will take `base_ms` to complete.
///
/// ```
/// use skywatch_executive::constants::time_to_complete;
///
/// assert_eq!(time_to_complete(20_000, 1.1, 10_000), 32_000);
/// ```
pub fn time_to_complete(base_ms: u64, fudge_factor: f64, pad_ms: u64) -> u64 {
    let scaled = (base_ms as f64 * fudge_factor).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 {
        scaled as u64
    } else {
        0
    };
    scaled.saturating_add(pad_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_base_still_waits_for_pad() {
        assert_eq!(time_to_complete(0, DEFAULT_FUDGE_FACTOR, DEFAULT_PAD_MS), 10_000);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        assert_eq!(time_to_complete(u64::MAX, 2.0, DEFAULT_PAD_MS), u64::MAX);
    }
}
