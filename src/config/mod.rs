//! JSON configuration for the binaries.

pub mod inspect;
pub mod spc;
