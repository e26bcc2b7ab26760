//! In-memory repositories.
//!
//! Each repository keeps its rows behind a `parking_lot::RwLock`. Every
//! operation takes the lock once and does all of its work while holding it,
//! which gives the same per-operation atomicity as the `PostgreSQL` backend.
//! Locks are never held across an `.await`.

mod carts;
mod orders;
mod products;
mod users;

pub use carts::MemoryCartRepository;
pub use orders::MemoryOrderRepository;
pub use products::MemoryProductRepository;
pub use users::MemoryUserRepository;

/// Convert a `u32` page window into slice bounds.
fn window(len: usize, limit: u32, offset: u32) -> std::ops::Range<usize> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
    let end = start
        .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
        .min(len);
    start..end
}

#[cfg(test)]
mod tests {
    use super::window;

    #[test]
    fn test_window_clamps_to_len() {
        assert_eq!(window(10, 5, 0), 0..5);
        assert_eq!(window(10, 5, 8), 8..10);
        assert_eq!(window(10, 5, 20), 10..10);
    }
}
