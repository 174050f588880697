//! Static initializer safety classification
//!
//! Decides, per class in a batch, whether its `<clinit>` can be replayed in a fresh process
//! without observing or producing state that differs from the original run. Classification is a
//! whole-batch fixed point: a class is only safe if everything its initializer reaches is safe.

mod catalog;
mod dependencies;
mod explorer;
mod oracle;
mod report;
mod settings;
mod solver;
mod walker;

pub use catalog::*;
pub use dependencies::*;
pub use explorer::*;
pub use oracle::*;
pub use report::*;
pub use settings::*;
pub use solver::*;
pub use walker::*;
