//! Dual-toolhead (IDEX) bed-mesh compensation with symmetric gantry tilt.
//!
//! While the two carriages run linked (COPY or MIRROR), every commanded
//! move samples the bed mesh under both toolheads, tilts the quad gantry to
//! split the height difference evenly between its left and right sides, and
//! lifts the move by the primary sample. Unlinked moves pass through to the
//! previously-installed single-toolhead transform untouched.

pub mod config;
pub mod harness;
pub mod hook;
pub mod profile;
pub mod transform;
