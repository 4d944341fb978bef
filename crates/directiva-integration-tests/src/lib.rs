//! Integration tests for the assembled Directiva Agrícola application.
//!
//! See the `tests/` directory; this crate has no library surface.
