//! macOS bundle creation, signing and packaging.

pub mod app;
pub mod dmg;
pub mod dylib;
pub mod lipo;
pub mod sign;
