//! # rendergraph-core
//!
//! Small, dependency-light utilities shared by the rendergraph compiler.
//! Currently this is just the allocation-reuse [`pool`] module; it is kept
//! as its own crate so it can be depended on without pulling in the rest of
//! the compiler.

pub mod pool;

/// Core library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
