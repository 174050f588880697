use crate::analysis::catalog::{ClassCatalog, ClassRecord, ClassResolver};
use crate::analysis::dependencies::DependencyGraph;
use crate::analysis::explorer::{explore, IntrinsicVerdict};
use crate::analysis::oracle::UnsafeCause;
use crate::analysis::report::AnalysisReport;
use crate::analysis::settings::Settings;
use crate::jvm::Name;
use std::collections::HashMap;

/// Final per-class verdicts plus the aggregate counters for the run
pub struct Classification {
    /// `true` means the class's static initializer is safe to replay
    pub verdicts: HashMap<String, bool>,
    pub report: AnalysisReport,
}

/// Drives the three classification phases over a batch of loaded classes
///
/// Phase 1 judges each class on its own instructions (and the static call graph they reach).
/// Phase 2 downgrades classes below an unsafe superclass or direct interface. Phase 3 downgrades
/// classes whose recorded dependency edges point at unsafe classes, repeated to a fixed point.
///
/// Verdicts only ever move from safe to unsafe, so the fixed point exists and each pass that
/// changes nothing terminates the run.
pub struct Solver<'a, R> {
    catalog: &'a ClassCatalog<R>,
    settings: &'a Settings,
}

impl<'a, R: ClassResolver> Solver<'a, R> {
    pub fn new(catalog: &'a ClassCatalog<R>, settings: &'a Settings) -> Solver<'a, R> {
        Solver { catalog, settings }
    }

    pub fn classify(&self, targets: &[String]) -> Classification {
        let mut verdicts: HashMap<String, bool> = HashMap::new();
        let mut graph = DependencyGraph::new();
        let mut report = AnalysisReport::new();
        report.class_count = targets.len();

        self.phase_intrinsic(targets, &mut verdicts, &mut graph, &mut report);
        self.phase_inheritance(targets, &mut verdicts, &mut report);
        self.phase_dependencies(targets, &mut verdicts, &graph, &mut report);

        Classification { verdicts, report }
    }

    fn is_seeded(&self, name: &str) -> bool {
        self.settings.seed_safe_names.contains(name)
    }

    fn phase_intrinsic(
        &self,
        targets: &[String],
        verdicts: &mut HashMap<String, bool>,
        graph: &mut DependencyGraph,
        report: &mut AnalysisReport,
    ) {
        for name in targets {
            let record = self.catalog.lookup_class(name);
            if record.and_then(ClassRecord::initializer).is_some() {
                report.initializer_count += 1;
            }

            if self.is_seeded(name) {
                log::debug!("[seed] class: {} pre-marked safe", name);
                verdicts.insert(name.clone(), true);
                report.safe_count += 1;
                continue;
            }

            let record = match record {
                Some(record) => record,
                None => {
                    log::error!("[error][unsafe] class: {} cause: not loaded", name);
                    verdicts.insert(name.clone(), false);
                    report.tally(UnsafeCause::InternalError);
                    continue;
                }
            };

            match explore(self.catalog, self.settings, record, graph) {
                IntrinsicVerdict::Safe => {
                    verdicts.insert(name.clone(), true);
                    report.safe_count += 1;
                }
                IntrinsicVerdict::Unsafe(cause) => {
                    log::debug!("[unsafe] class: {} final cause: {}", name, cause);
                    verdicts.insert(name.clone(), false);
                    report.tally(cause);
                }
            }
        }
    }

    fn phase_inheritance(
        &self,
        targets: &[String],
        verdicts: &mut HashMap<String, bool>,
        report: &mut AnalysisReport,
    ) {
        for name in targets {
            if self.is_seeded(name) || verdicts.get(name) != Some(&true) {
                continue;
            }
            let record = match self.catalog.lookup_class(name) {
                Some(record) => record,
                None => continue,
            };
            if let Some(cause) = self.hierarchy_cause(record, verdicts) {
                log::debug!("[unsafe] class: {} final cause: {}", name, cause);
                verdicts.insert(name.clone(), false);
                report.downgrade(cause);
            }
        }
    }

    /// Check `record`'s full superclass chain and its direct interfaces against the current
    /// verdicts
    ///
    /// The chain is walked to the root rather than trusting an ancestor's safe verdict, since
    /// this pass mutates verdicts in place and an ancestor later in the batch may not have had
    /// its own hierarchy checked yet. The walk stops at a seeded ancestor: trusted classes are
    /// trusted together with their hierarchy. An ancestor that is neither classified nor seeded
    /// is a catalog inconsistency. Unclassified direct interfaces are ignored: an interface
    /// initializer only runs for interfaces declaring default methods, and those surface as
    /// classified batch members.
    fn hierarchy_cause(
        &self,
        record: &ClassRecord,
        verdicts: &HashMap<String, bool>,
    ) -> Option<UnsafeCause> {
        let mut current = record;
        while let Some(super_name) = &current.super_name {
            let super_name = super_name.as_str();
            if self.is_seeded(super_name) {
                break;
            }
            match verdicts.get(super_name) {
                Some(&false) => return Some(UnsafeCause::InheritedUnsafe),
                Some(&true) => {}
                None => {
                    log::error!(
                        "[error][unsafe] class: {} cause: unclassified superclass: {}",
                        record.name,
                        super_name
                    );
                    return Some(UnsafeCause::InternalError);
                }
            }
            current = match self.catalog.lookup_class(super_name) {
                Some(super_record) => super_record,
                None => {
                    log::error!(
                        "[error][unsafe] class: {} cause: unloaded superclass: {}",
                        record.name,
                        super_name
                    );
                    return Some(UnsafeCause::InternalError);
                }
            };
        }

        for interface in &record.interfaces {
            let interface = interface.as_str();
            if let Some(interface_record) = self.catalog.lookup_class(interface) {
                if !interface_record.is_interface {
                    log::error!(
                        "[error] class: {} lists non-interface {} as an interface",
                        record.name,
                        interface
                    );
                }
            }
            if verdicts.get(interface) == Some(&false) {
                return Some(UnsafeCause::InterfaceUnsafe);
            }
        }

        None
    }

    fn phase_dependencies(
        &self,
        targets: &[String],
        verdicts: &mut HashMap<String, bool>,
        graph: &DependencyGraph,
        report: &mut AnalysisReport,
    ) {
        loop {
            // Downgrades are judged against the verdicts at the start of the pass and applied
            // at the end, so the outcome does not depend on batch order
            let mut downgrades: Vec<(String, UnsafeCause)> = vec![];

            for name in targets {
                if self.is_seeded(name) || verdicts.get(name) != Some(&true) {
                    continue;
                }
                let dependencies = match graph.dependencies_of(name) {
                    Some(dependencies) => dependencies,
                    None => continue,
                };
                for dependency in dependencies {
                    if self.is_seeded(dependency) {
                        continue;
                    }
                    match verdicts.get(dependency.as_str()) {
                        Some(&true) => {}
                        Some(&false) => {
                            log::debug!(
                                "[unsafe] class: {} cause: unsafe dependency: {}",
                                name,
                                dependency
                            );
                            downgrades.push((name.clone(), UnsafeCause::DependencyUnsafe));
                            break;
                        }
                        None => {
                            log::error!(
                                "[error][unsafe] class: {} cause: unclassified dependency: {}",
                                name,
                                dependency
                            );
                            downgrades.push((name.clone(), UnsafeCause::InternalError));
                            break;
                        }
                    }
                }
            }

            if downgrades.is_empty() {
                return;
            }
            for (name, cause) in downgrades {
                verdicts.insert(name, false);
                report.downgrade(cause);
            }
        }
    }
}
