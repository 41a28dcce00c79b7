// ABOUTME: Command module aggregator for the localcloud CLI.
// ABOUTME: Re-exports validate and simulate command handlers.

mod simulate;
mod validate;

pub use simulate::{SimulateOptions, simulate};
pub use validate::validate;
