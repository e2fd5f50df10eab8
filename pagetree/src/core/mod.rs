//! Deterministic, pure logic of the session engine.
//!
//! Core modules never touch the session store or the filesystem. They operate
//! on in-memory trees and data maps and return deterministic outputs.

pub mod invariants;
pub mod navigator;
pub mod scope;
