//! Integration tests for archsim
//!
//! These tests drive complete simulation runs through the public API of
//! `archsim-core` and `archsim-sim`, from topology construction or JSON
//! input through to the serialized result.

#[path = "integration/determinism.rs"]
mod determinism;
#[path = "integration/overload.rs"]
mod overload;
#[path = "integration/scenario.rs"]
mod scenario;
#[path = "integration/serialization.rs"]
mod serialization;
