pub mod error;
pub mod frame;
pub mod pattern;
pub mod status;

#[cfg(test)]
mod tests;

pub use error::{CallError, QuadrpcError, Result};
pub use frame::{CallId, Frame, MethodName, Payload};
pub use pattern::Pattern;
pub use status::{Code, Outcome, Status};
