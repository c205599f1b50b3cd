pub mod validator;

pub use validator::{RiskValidator, ValidationContext, ValidationResult};
