//! Binary reading of the JVM class file format

mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod version;

pub use crate::jvm::binary_format::Deserialize;
pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use version::*;
