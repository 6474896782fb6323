//! Domain models for the clinical registry.

mod patient;
mod user;
mod validation;
mod visit;

pub use patient::*;
pub use user::*;
pub use validation::*;
pub use visit::*;
