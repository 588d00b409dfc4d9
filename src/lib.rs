//src/lib.rs
pub mod ast;
pub mod common;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod semantics;

pub use common::StateAllocator;
pub use error::{CompilerBug, ValidateError, ValidatorFault};
pub use semantics::break_continue::BreakContinueTransformer;
pub use semantics::validator::{ValidatorConfig, validate, validate_with_config};
