use crate::analysis::oracle::UnsafeCause;
use std::collections::HashMap;
use std::fmt;

/// Aggregate outcome counters for one classification run
///
/// Counters live on the report value returned to the caller; nothing is accumulated in process
/// globals, so repeated runs in one process do not bleed into each other.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    /// Classes submitted for classification
    pub class_count: usize,
    /// Of those, classes that declare a static initializer
    pub initializer_count: usize,
    /// Classes whose final verdict is safe
    pub safe_count: usize,
    unsafe_counts: HashMap<UnsafeCause, usize>,
}

// Display order for per-cause counters
const CAUSES: &[UnsafeCause] = &[
    UnsafeCause::InstanceFieldAccess,
    UnsafeCause::CrossClassGetStatic,
    UnsafeCause::CrossClassPutStatic,
    UnsafeCause::VirtualCall,
    UnsafeCause::InterfaceCall,
    UnsafeCause::DynamicCall,
    UnsafeCause::NativeLibraryLoad,
    UnsafeCause::Throw,
    UnsafeCause::InheritedUnsafe,
    UnsafeCause::InterfaceUnsafe,
    UnsafeCause::DependencyUnsafe,
    UnsafeCause::InternalError,
];

impl AnalysisReport {
    pub fn new() -> AnalysisReport {
        AnalysisReport::default()
    }

    /// Count one class as finally unsafe for the given cause
    pub fn tally(&mut self, cause: UnsafeCause) {
        *self.unsafe_counts.entry(cause).or_insert(0) += 1;
    }

    /// Reverse a prior safe count into an unsafe one (phase 2 and 3 downgrades)
    pub fn downgrade(&mut self, cause: UnsafeCause) {
        self.safe_count -= 1;
        self.tally(cause);
    }

    pub fn unsafe_count(&self, cause: UnsafeCause) -> usize {
        self.unsafe_counts.get(&cause).copied().unwrap_or(0)
    }

    pub fn total_unsafe(&self) -> usize {
        self.unsafe_counts.values().sum()
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "classes analyzed:    {}", self.class_count)?;
        writeln!(
            f,
            "with <clinit>:       {} ({:.1}%)",
            self.initializer_count,
            percent(self.initializer_count, self.class_count)
        )?;
        writeln!(
            f,
            "safe:                {} ({:.1}%)",
            self.safe_count,
            percent(self.safe_count, self.class_count)
        )?;
        writeln!(
            f,
            "unsafe:              {} ({:.1}%)",
            self.total_unsafe(),
            percent(self.total_unsafe(), self.class_count)
        )?;
        for cause in CAUSES {
            let count = self.unsafe_count(*cause);
            if count > 0 {
                writeln!(f, "  {:<24} {}", format!("{}:", cause), count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[test]
    fn tallies_per_cause() {
        let mut report = AnalysisReport::new();
        report.tally(UnsafeCause::Throw);
        report.tally(UnsafeCause::Throw);
        report.tally(UnsafeCause::VirtualCall);
        assert_eq!(report.unsafe_count(UnsafeCause::Throw), 2);
        assert_eq!(report.unsafe_count(UnsafeCause::VirtualCall), 1);
        assert_eq!(report.total_unsafe(), 3);
    }

    #[test]
    fn downgrade_moves_a_safe_class() {
        let mut report = AnalysisReport::new();
        report.class_count = 2;
        report.safe_count = 2;
        report.downgrade(UnsafeCause::DependencyUnsafe);
        assert_eq!(report.safe_count, 1);
        assert_eq!(report.unsafe_count(UnsafeCause::DependencyUnsafe), 1);
    }

    #[test]
    fn display_handles_empty_run() {
        let report = AnalysisReport::new();
        let rendered = report.to_string();
        assert!(rendered.contains("classes analyzed:    0"));
        assert!(rendered.contains("(0.0%)"));
    }
}
