#![forbid(unsafe_code)]
//! Conformance harness for the resq sequencer.

pub mod scenario;
