//! Shared test infrastructure: headless manager fixtures, recording
//! window handlers, a scripted emulator, and tree-invariant assertions.

pub mod assertions;
pub mod fixtures;
