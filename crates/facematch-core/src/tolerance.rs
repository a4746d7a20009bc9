//! Match-tolerance policy.
//!
//! Tolerance is the Euclidean-distance cutoff for calling two faces the
//! same person. Clients may request one; anything outside the accepted
//! range resolves to the default without error.

/// Tolerance applied when the client sends none (or an unusable one).
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Lowest tolerance a client may request.
pub const TOLERANCE_MIN: f64 = 0.3;

/// Highest tolerance a client may request.
pub const TOLERANCE_MAX: f64 = 1.0;

/// Resolve a client-requested tolerance to the one actually applied.
///
/// `None`, values outside `[TOLERANCE_MIN, TOLERANCE_MAX]` and NaN all
/// resolve to [`DEFAULT_TOLERANCE`].
pub fn resolve(requested: Option<f64>) -> f64 {
    match requested {
        Some(t) if (TOLERANCE_MIN..=TOLERANCE_MAX).contains(&t) => t,
        _ => DEFAULT_TOLERANCE,
    }
}
