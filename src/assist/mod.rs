pub mod gemini;
pub mod keyring;

pub use gemini::{suggest_breakdown, BreakdownClient};
