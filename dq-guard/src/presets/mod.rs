//! Ready-made table declarations, suites and checkpoints.

pub mod trading;
