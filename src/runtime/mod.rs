pub mod builder;
pub mod error;
pub mod eval;
pub mod memo;
pub mod node;
pub mod scope;
pub mod value;

pub use builder::{Builder, Program};
pub use eval::{EvalOptions, Evaluator};
pub use value::Value;
