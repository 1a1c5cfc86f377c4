//! Step iterators for frame animations
//!
//! Thin wrappers over range adapters so effects can pick a traversal
//! direction at runtime. Inverted ranges yield nothing.

/// Yields `lo..hi` in increasing order.
pub fn iterate_up(lo: usize, hi: usize) -> impl Iterator<Item = usize> {
    lo..hi
}

/// Yields `hi-1..=lo` in decreasing order.
pub fn iterate_down(hi: usize, lo: usize) -> impl Iterator<Item = usize> {
    (lo..hi).rev()
}

/// Iterates up to `n` then back down, without repeating the endpoints.
pub fn bounce_up(n: usize) -> impl Iterator<Item = usize> {
    iterate_up(0, n).chain(iterate_down(n.saturating_sub(1), 1))
}

/// Iterates down to 0 then back up, without repeating the endpoints.
pub fn bounce_down(n: usize) -> impl Iterator<Item = usize> {
    iterate_down(n, 0).chain(iterate_up(1, n.saturating_sub(1)))
}
