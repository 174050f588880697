use crate::analysis::catalog::{ClassResolver, MethodRecord};
use crate::analysis::oracle::{InstructionVerdict, MethodRef, SafetyOracle, UnsafeCause};

/// Outcome of scanning one method body
pub enum StepResult<'a> {
    /// Every instruction was permitted; the scan surfaced these statically resolved callees
    /// and cross-class dependency edges
    Continue {
        callees: Vec<MethodRef<'a>>,
        dependencies: Vec<String>,
    },
    /// Scanning stopped at the first forbidden instruction
    Failed(UnsafeCause),
}

/// Scan a method body in program order, short-circuiting on the first forbidden instruction
///
/// Instructions are judged independently of reachability: an unsafe instruction in dead code
/// still fails the method. A method without a `Code` attribute has no instructions and trivially
/// continues.
pub fn walk_method<'a, R: ClassResolver>(
    oracle: &SafetyOracle<'a, R>,
    subject: &str,
    method: &MethodRecord,
) -> StepResult<'a> {
    let mut callees = vec![];
    let mut dependencies = vec![];

    for instruction in &method.instructions {
        match oracle.judge(subject, instruction) {
            InstructionVerdict::Safe {
                callees: more_callees,
                dependencies: more_dependencies,
            } => {
                callees.extend(more_callees);
                dependencies.extend(more_dependencies);
            }
            InstructionVerdict::Unsafe(cause) => return StepResult::Failed(cause),
        }
    }

    StepResult::Continue {
        callees,
        dependencies,
    }
}
