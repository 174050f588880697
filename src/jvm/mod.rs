//! Read JVM class files
//!
//! This is the binary layer underneath the safety analysis: parsing the class file container
//! (constant pool, fields, methods, attributes) and decoding method bytecode into the
//! instruction stream the analysis consumes.

mod access_flags;
mod binary_format;
pub mod bytecode;
pub mod class_file;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use binary_format::*;
pub use class_file::{ClassConstantIndex, ConstantIndex, Utf8ConstantIndex};
pub use descriptors::*;
pub use errors::*;
pub use names::*;
