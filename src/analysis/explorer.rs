use crate::analysis::catalog::{ClassCatalog, ClassRecord, ClassResolver};
use crate::analysis::dependencies::DependencyGraph;
use crate::analysis::oracle::{MethodRef, SafetyOracle, UnsafeCause};
use crate::analysis::settings::Settings;
use crate::analysis::walker::{walk_method, StepResult};
use std::collections::HashSet;

/// Outcome of exploring one class on its own, before inheritance and dependency effects
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntrinsicVerdict {
    Safe,
    Unsafe(UnsafeCause),
}

/// Explore the call graph rooted at `subject`'s static initializer
///
/// Worklist traversal over statically resolved callees. Each method is visited at most once,
/// keyed by its (class, name, descriptor) key, so mutual recursion terminates. Dependency edges
/// surfaced anywhere in the traversal are attributed to `subject`: its safety is contingent on
/// them no matter how deep in the call chain they appear.
///
/// A class without a static initializer is trivially safe.
pub fn explore<'a, R: ClassResolver>(
    catalog: &'a ClassCatalog<R>,
    settings: &'a Settings,
    subject: &ClassRecord,
    graph: &mut DependencyGraph,
) -> IntrinsicVerdict {
    let initializer = match subject.initializer() {
        Some(initializer) => initializer,
        None => return IntrinsicVerdict::Safe,
    };

    let oracle = SafetyOracle::new(catalog, settings);
    let subject_name = subject.name.to_string();

    let mut worklist: Vec<MethodRef<'a>> = vec![];
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(format!("{}.<clinit>()V", subject_name));

    // The initializer is borrowed from `subject` rather than the catalog, so it is walked
    // before the worklist loop takes over
    match walk_method(&oracle, &subject_name, initializer) {
        StepResult::Failed(cause) => return IntrinsicVerdict::Unsafe(cause),
        StepResult::Continue {
            callees,
            dependencies,
        } => {
            for dependency in &dependencies {
                graph.record(&subject_name, dependency);
            }
            worklist.extend(callees);
        }
    }

    while let Some(callee) = worklist.pop() {
        if !visited.insert(callee.key()) {
            continue;
        }
        match walk_method(&oracle, &subject_name, callee.method) {
            StepResult::Failed(cause) => return IntrinsicVerdict::Unsafe(cause),
            StepResult::Continue {
                callees,
                dependencies,
            } => {
                for dependency in &dependencies {
                    graph.record(&subject_name, dependency);
                }
                worklist.extend(callees);
            }
        }
    }

    IntrinsicVerdict::Safe
}
