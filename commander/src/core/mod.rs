//! Core identity types shared by registration and runtime.

mod mode;
mod type_key;

pub use mode::CompileMode;
pub use type_key::TypeKey;
