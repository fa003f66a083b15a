//! Averaging strategies over continuous values
//!
//! All three strategies return `0.0` for an empty buffer.

use crate::buffer::ReadingBuffer;

/// Arithmetic mean of the buffered continuous values
pub fn average(buffer: &ReadingBuffer) -> f64 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum: f64 = buffer.iter().map(|r| r.continuous).sum();
    sum / buffer.len() as f64
}

/// Weighted mean, `weights[0]` applying to the most recent reading
///
/// Readings older than the weight table contribute nothing. A zero total
/// weight yields `0.0`.
pub fn weighted_average(buffer: &ReadingBuffer, weights: &[f64]) -> f64 {
    let (num, den) = buffer
        .iter_recent()
        .zip(weights.iter())
        .fold((0.0, 0.0), |(num, den), (reading, w)| {
            (num + w * reading.continuous, den + w)
        });

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Mean weighted by `exp((t_i - t_newest) / tau)`
///
/// Measuring ages from the newest reading keeps the exponent near zero; the
/// common factor cancels between numerator and denominator.
pub fn exponential_average(buffer: &ReadingBuffer, time_constant_ms: f64) -> f64 {
    let newest = match buffer.last() {
        Some(r) => r.timestamp,
        None => return 0.0,
    };

    let (num, den) = buffer.iter().fold((0.0, 0.0), |(num, den), reading| {
        let age = newest.saturating_sub(reading.timestamp) as f64;
        let w = libm::exp(-age / time_constant_ms);
        (num + w * reading.continuous, den + w)
    });

    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Reading;

    fn buffer_of(values: &[(u64, f64)]) -> ReadingBuffer {
        let mut buffer = ReadingBuffer::samples(values.len().max(1));
        for &(t, v) in values {
            buffer.push(Reading::continuous(t, v));
        }
        buffer
    }

    #[test]
    fn empty_buffers_yield_zero() {
        let empty = ReadingBuffer::samples(3);
        assert_eq!(average(&empty), 0.0);
        assert_eq!(weighted_average(&empty, &[1.0, 1.0]), 0.0);
        assert_eq!(exponential_average(&empty, 1000.0), 0.0);
    }

    #[test]
    fn mean_of_three() {
        let buffer = buffer_of(&[(1, 10.0), (2, 20.0), (3, 30.0)]);
        assert_eq!(average(&buffer), 20.0);
    }

    #[test]
    fn weights_index_from_most_recent() {
        let buffer = buffer_of(&[(1, 10.0), (2, 20.0), (3, 30.0)]);

        // Only the newest two carry weight: (3*30 + 1*20) / 4
        let value = weighted_average(&buffer, &[3.0, 1.0]);
        assert!((value - 27.5).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_yield_zero() {
        let buffer = buffer_of(&[(1, 10.0)]);
        assert_eq!(weighted_average(&buffer, &[0.0]), 0.0);
    }

    #[test]
    fn exponential_favours_recent_samples() {
        let buffer = buffer_of(&[(0, 0.0), (10_000, 100.0)]);
        let value = exponential_average(&buffer, 1_000.0);

        // Old sample weighted by e^-10: result is very close to 100
        assert!(value > 99.9);
        assert!(value < 100.0);
    }

    #[test]
    fn exponential_equal_ages_is_plain_mean() {
        let buffer = buffer_of(&[(5, 4.0)]);
        assert_eq!(exponential_average(&buffer, 10.0), 4.0);
    }
}
