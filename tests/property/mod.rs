//! Property-based tests for batch generation guarantees

mod batch_invariants;
