use crate::analysis::catalog::{ClassCatalog, ClassRecord, ClassResolver, MethodRecord};
use crate::analysis::settings::Settings;
use crate::jvm::bytecode::{FieldKind, Instruction, InvokeKind};
use crate::jvm::{FieldType, Name, ParseDescriptor, UnqualifiedName};
use std::fmt;

/// Why a class was judged unsafe
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnsafeCause {
    /// Instance field access (`getfield`/`putfield`): for sure non-constant data
    InstanceFieldAccess,
    /// `getstatic` against another class, outside the permitted final-primitive case
    CrossClassGetStatic,
    /// `putstatic` against another class
    CrossClassPutStatic,
    /// `invokevirtual`: receiver not statically fixed
    VirtualCall,
    /// `invokeinterface`: receiver not statically fixed
    InterfaceCall,
    /// `invokedynamic`: target not statically determinable
    DynamicCall,
    /// Call to a native-library loader
    NativeLibraryLoad,
    /// `athrow`
    Throw,
    /// Unsafe superclass (phase 2)
    InheritedUnsafe,
    /// Unsafe implemented interface (phase 2)
    InterfaceUnsafe,
    /// Unsafe dependency (phase 3)
    DependencyUnsafe,
    /// Catalog inconsistency: unresolvable super/interface/dependency/call target
    InternalError,
}

impl fmt::Display for UnsafeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause = match self {
            UnsafeCause::InstanceFieldAccess => "instance field access",
            UnsafeCause::CrossClassGetStatic => "cross-class getstatic",
            UnsafeCause::CrossClassPutStatic => "cross-class putstatic",
            UnsafeCause::VirtualCall => "virtual call",
            UnsafeCause::InterfaceCall => "interface call",
            UnsafeCause::DynamicCall => "dynamic call",
            UnsafeCause::NativeLibraryLoad => "native library load",
            UnsafeCause::Throw => "throw",
            UnsafeCause::InheritedUnsafe => "unsafe superclass",
            UnsafeCause::InterfaceUnsafe => "unsafe interface",
            UnsafeCause::DependencyUnsafe => "unsafe dependency",
            UnsafeCause::InternalError => "internal error",
        };
        f.write_str(cause)
    }
}

/// A method together with its defining class
#[derive(Copy, Clone)]
pub struct MethodRef<'a> {
    pub class: &'a ClassRecord,
    pub method: &'a MethodRecord,
}

impl<'a> MethodRef<'a> {
    /// Globally unique method key
    pub fn key(&self) -> String {
        format!(
            "{}.{}{}",
            self.class.name, self.method.name, self.method.descriptor
        )
    }
}

/// Verdict for a single instruction
pub enum InstructionVerdict<'a> {
    /// Permitted; carries the statically resolved callees and the cross-class dependency edges
    /// the permission is contingent on
    Safe {
        callees: Vec<MethodRef<'a>>,
        dependencies: Vec<String>,
    },
    Unsafe(UnsafeCause),
}

impl<'a> InstructionVerdict<'a> {
    fn safe() -> InstructionVerdict<'a> {
        InstructionVerdict::Safe {
            callees: vec![],
            dependencies: vec![],
        }
    }
}

/// Judges one instruction at a time, against the class currently under analysis
pub struct SafetyOracle<'a, R> {
    catalog: &'a ClassCatalog<R>,
    settings: &'a Settings,
}

impl<'a, R: ClassResolver> SafetyOracle<'a, R> {
    pub fn new(catalog: &'a ClassCatalog<R>, settings: &'a Settings) -> SafetyOracle<'a, R> {
        SafetyOracle { catalog, settings }
    }

    /// Judge one instruction; `subject` is the class whose initializer is being analyzed
    pub fn judge(&self, subject: &str, instruction: &Instruction) -> InstructionVerdict<'a> {
        match instruction {
            Instruction::Field {
                kind,
                owner,
                name,
                descriptor,
            } => self.judge_field(subject, *kind, owner, name, descriptor),
            Instruction::Invoke {
                kind,
                owner,
                name,
                descriptor,
            } => self.judge_invoke(subject, *kind, owner, name, descriptor),
            Instruction::InvokeDynamic => {
                log::debug!("[unsafe] class: {} cause: invokedynamic", subject);
                InstructionVerdict::Unsafe(UnsafeCause::DynamicCall)
            }
            Instruction::Throw => {
                // Conservative: no modeling of post-throw control-flow joins
                log::debug!("[unsafe] class: {} cause: throw", subject);
                InstructionVerdict::Unsafe(UnsafeCause::Throw)
            }
            Instruction::Other(_) => InstructionVerdict::safe(),
        }
    }

    /*
     * Field cases:
     *   1. getfield/putfield: non-static field is for sure non-constant data
     *   2. getstatic: self is fine (nothing can have altered a field of a class that is still
     *      initializing); cross-class only for final primitives, and only under the minimal
     *      policy
     *   3. putstatic: only to the subject's own statics (everything judged safe up to this
     *      point, so nothing non-constant can be written)
     */
    fn judge_field(
        &self,
        subject: &str,
        kind: FieldKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> InstructionVerdict<'a> {
        match kind {
            FieldKind::GetField | FieldKind::PutField => {
                log::debug!(
                    "[unsafe] class: {} cause: get/putfield {}.{}",
                    subject,
                    owner,
                    name
                );
                InstructionVerdict::Unsafe(UnsafeCause::InstanceFieldAccess)
            }

            FieldKind::GetStatic if owner == subject => InstructionVerdict::safe(),
            FieldKind::GetStatic => {
                if !self.settings.allow_cross_class_final_getstatic {
                    log::debug!(
                        "[unsafe] class: {} cause: getstatic {}.{}",
                        subject,
                        owner,
                        name
                    );
                    return InstructionVerdict::Unsafe(UnsafeCause::CrossClassGetStatic);
                }

                // Reference-typed reads are out even under the minimal policy: the referenced
                // object is mutable state
                let primitive = FieldType::parse(descriptor)
                    .map(|t| t.is_primitive())
                    .unwrap_or(false);
                if !primitive {
                    log::debug!(
                        "[unsafe] class: {} cause: getstatic (reference) {}.{}",
                        subject,
                        owner,
                        name
                    );
                    return InstructionVerdict::Unsafe(UnsafeCause::CrossClassGetStatic);
                }

                let owner_record = match self.catalog.load(owner) {
                    Some(record) => record,
                    None => {
                        log::error!(
                            "[error][unsafe] class: {} cause: getstatic owner unresolvable: {}",
                            subject,
                            owner
                        );
                        return InstructionVerdict::Unsafe(UnsafeCause::InternalError);
                    }
                };
                let field = match owner_record.field(name) {
                    Some(field) => field,
                    None => {
                        log::error!(
                            "[error][unsafe] class: {} cause: getstatic no field {}.{}",
                            subject,
                            owner,
                            name
                        );
                        return InstructionVerdict::Unsafe(UnsafeCause::InternalError);
                    }
                };

                if field.is_final() {
                    InstructionVerdict::Safe {
                        callees: vec![],
                        dependencies: vec![owner.to_owned()],
                    }
                } else {
                    log::debug!(
                        "[unsafe] class: {} cause: getstatic (non-final) {}.{}",
                        subject,
                        owner,
                        name
                    );
                    InstructionVerdict::Unsafe(UnsafeCause::CrossClassGetStatic)
                }
            }

            // No dependency edge here: a class depending on itself is dead bookkeeping
            FieldKind::PutStatic if owner == subject => InstructionVerdict::safe(),
            FieldKind::PutStatic => {
                log::debug!(
                    "[unsafe] class: {} cause: putstatic {}.{}",
                    subject,
                    owner,
                    name
                );
                InstructionVerdict::Unsafe(UnsafeCause::CrossClassPutStatic)
            }
        }
    }

    fn judge_invoke(
        &self,
        subject: &str,
        kind: InvokeKind,
        owner: &str,
        name: &str,
        descriptor: &str,
    ) -> InstructionVerdict<'a> {
        // Native library loads are unsafe no matter the owner or signature
        if name == UnqualifiedName::LOAD_LIBRARY.as_str() {
            log::debug!(
                "[unsafe] class: {} cause: native library call {}.{}",
                subject,
                owner,
                name
            );
            return InstructionVerdict::Unsafe(UnsafeCause::NativeLibraryLoad);
        }

        match kind {
            // The receiver is determined at runtime, so the callee set is not statically fixed
            InvokeKind::Virtual => {
                log::debug!(
                    "[unsafe] class: {} cause: invokevirtual {}.{}{}",
                    subject,
                    owner,
                    name,
                    descriptor
                );
                InstructionVerdict::Unsafe(UnsafeCause::VirtualCall)
            }
            InvokeKind::Interface => {
                log::debug!(
                    "[unsafe] class: {} cause: invokeinterface {}.{}{}",
                    subject,
                    owner,
                    name,
                    descriptor
                );
                InstructionVerdict::Unsafe(UnsafeCause::InterfaceCall)
            }

            // Exact dispatch: the owner defines the callee
            InvokeKind::Static => match self.catalog.load(owner) {
                Some(class) => match class.method(name, descriptor) {
                    Some(method) => InstructionVerdict::Safe {
                        callees: vec![MethodRef { class, method }],
                        dependencies: vec![owner.to_owned()],
                    },
                    None => {
                        log::error!(
                            "[error][unsafe] class: {} cause: invokestatic no method {}.{}{}",
                            subject,
                            owner,
                            name,
                            descriptor
                        );
                        InstructionVerdict::Unsafe(UnsafeCause::InternalError)
                    }
                },
                None => {
                    log::error!(
                        "[error][unsafe] class: {} cause: invokestatic owner unresolvable: {}",
                        subject,
                        owner
                    );
                    InstructionVerdict::Unsafe(UnsafeCause::InternalError)
                }
            },

            // Constructor/private/super call: walk the superclass chain from the declared
            // owner until some class defines (name, descriptor)
            InvokeKind::Special => {
                let mut current = match self.catalog.load(owner) {
                    Some(class) => class,
                    None => {
                        log::error!(
                            "[error][unsafe] class: {} cause: invokespecial owner unresolvable: {}",
                            subject,
                            owner
                        );
                        return InstructionVerdict::Unsafe(UnsafeCause::InternalError);
                    }
                };

                loop {
                    if let Some(method) = current.method(name, descriptor) {
                        return InstructionVerdict::Safe {
                            callees: vec![MethodRef {
                                class: current,
                                method,
                            }],
                            dependencies: vec![current.name.as_str().to_owned()],
                        };
                    }
                    match &current.super_name {
                        Some(super_name) => match self.catalog.load(super_name.as_str()) {
                            Some(super_class) => current = super_class,
                            None => {
                                log::error!(
                                    "[error][unsafe] class: {} cause: invokespecial super unresolvable: {}",
                                    subject,
                                    super_name
                                );
                                return InstructionVerdict::Unsafe(UnsafeCause::InternalError);
                            }
                        },
                        None => {
                            log::error!(
                                "[error][unsafe] class: {} cause: invokespecial method not found: {}.{}{}",
                                subject,
                                owner,
                                name,
                                descriptor
                            );
                            return InstructionVerdict::Unsafe(UnsafeCause::InternalError);
                        }
                    }
                }
            }
        }
    }
}
