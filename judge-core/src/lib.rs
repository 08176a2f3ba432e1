/// Host-side build step: language registry and compiler invocation
pub mod compiler;
pub mod error;
/// Verdict derivation and the per-submission judging flow
pub mod judge;
/// Runs one test case inside a leased box
pub mod run;
/// Isolation boxes: lifecycle, metadata sidecar and the box id pool
pub mod sandbox;
pub mod task;
pub mod utils;
