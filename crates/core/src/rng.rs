//! Seeded pseudo-random draws.
//!
//! Every draw is a pure function of a seed string: the string is hashed to a
//! 32-bit integer and mapped through `sin(x) * 10000`, keeping the fractional
//! part. There is no generator state to persist or thread between calls; a
//! caller that needs several draws derives one seed per draw by appending a
//! discriminator (a loop index, `"options"`, a question id).
//!
//! Determinism holds within one build. `f64::sin` is not guaranteed to be
//! bit-identical across platforms and libm versions, so orderings produced on a
//! different target may differ in rare cases.

/// Polynomial rolling hash (`h = h * 31 + unit`) over the UTF-16 code units of
/// `s`, truncated to a signed 32-bit integer at every step. Empty input hashes
/// to zero.
#[must_use]
pub fn string_to_integer(s: &str) -> i32 {
    s.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Deterministic value in `[0, 1)` derived from `seed`.
#[must_use]
pub fn random_from_seed(seed: &str) -> f64 {
    let x = f64::from(string_to_integer(seed)).sin() * 10_000.0;
    let fraction = x - x.floor();
    // `x - floor(x)` can round up to exactly 1.0 for tiny negative x.
    if fraction >= 1.0 { 0.0 } else { fraction }
}

/// Index in `0..=max` drawn from `seed`, used for Fisher–Yates swaps.
#[must_use]
pub fn index_from_seed(seed: &str, max: usize) -> usize {
    let span = max.saturating_add(1);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let j = (random_from_seed(seed) * span as f64).floor() as usize;
    j.min(max)
}
