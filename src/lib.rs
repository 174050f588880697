//! Classify JVM static initializers by whether they are safe to replay
//!
//! Given a batch of class files, decide per class whether running its `<clinit>` again in a
//! fresh process is guaranteed to reproduce the same static state. The analysis parses each
//! class file, scans initializer bytecode (following statically resolved calls), then settles
//! inheritance and cross-class dependency effects to a fixed point.
//!
//! ```
//! use clinitcheck::analysis::{ClassCatalog, ClassResolver, Settings, Solver};
//! use std::io;
//!
//! // Class bytes come from the embedder; this resolver knows no classes at all
//! struct NoClasses;
//! impl ClassResolver for NoClasses {
//!     fn resolve(&self, name: &str) -> io::Result<Vec<u8>> {
//!         Err(io::Error::new(io::ErrorKind::NotFound, name.to_owned()))
//!     }
//! }
//!
//! let catalog = ClassCatalog::new(NoClasses);
//! let settings = Settings::new();
//! let classification = Solver::new(&catalog, &settings).classify(&[]);
//! assert!(classification.verdicts.is_empty());
//! ```

pub mod analysis;
pub mod jvm;
