//! Library surface of louvor-dr
//!
//! Only the condition parser lives here; keeping it in the library
//! target makes it unit testable from outside the binary.

pub mod filters;
