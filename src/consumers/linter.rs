use crate::error::{NetlistError, NetlistResult};
use crate::structs::graph::ModuleGraph;
use crate::structs::module::Module;
use crate::structs::wire::{is_constant_wire, WireAllocator, WireId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const IMPLEMENTED_CHECKS: &str = r"
Here is the list of implemented structural checks, run on every module of a netlist:

 - Warning: every declared output is driven by a gate, by a subcircuit output, or is itself an input.
 - Error:   every wire read by a gate is driven by a gate, by a subcircuit output, or is an input.
 - Error:   no wire has more than one driver among gates, subcircuit outputs, inputs and constants.
 - Warning: no wire is declared both as an input and as an output.
 - Warning: every wire feeding a subcircuit input is driven.

The constant wires $false and $true always count as driven.
Any finding blocks flattening.
";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum DiagnosticKind {
    UndrivenOutput,
    UndrivenGateInput,
    MultiplyDriven,
    AliasConflict,
    UndrivenSubcircuitInput,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::UndrivenGateInput | DiagnosticKind::MultiplyDriven => Severity::Error,
            _ => Severity::Warning,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            DiagnosticKind::UndrivenOutput => "does not emit signals on the outputs",
            DiagnosticKind::UndrivenGateInput => "does not drive the gate inputs",
            DiagnosticKind::MultiplyDriven => "drives wires more than once",
            DiagnosticKind::AliasConflict => "declares wires both as inputs and as outputs",
            DiagnosticKind::UndrivenSubcircuitInput => "does not provide the subcircuit inputs",
        }
    }
}

/// A finding of the linter, with wires given by name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub module: String,
    pub wires: Vec<String>,
}

impl Diagnostic {
    /// The error for the first wire of this finding.
    pub fn to_error(&self) -> NetlistError {
        let module = self.module.clone();
        let wire = self.wires.first().cloned().unwrap_or_default();
        match self.kind {
            DiagnosticKind::AliasConflict => NetlistError::AliasConflict { module, wire },
            DiagnosticKind::MultiplyDriven => NetlistError::MultiplyDriven { module, wire },
            _ => NetlistError::UndrivenWire { module, wire },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: '{}' {}: {}",
            self.severity,
            self.module,
            self.kind.describe(),
            self.wires.join(", ")
        )
    }
}

/// Run every check on one module. Wires are returned by ID, in ascending order.
pub fn lint_module(module: &Module) -> Vec<(DiagnosticKind, Vec<WireId>)> {
    let undriven = |wires: &mut dyn Iterator<Item = WireId>| -> Vec<WireId> {
        wires
            .filter(|w| !module.is_driven(*w))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    // Constants are driven once by definition.
    let constant = |w: &WireId| is_constant_wire(module.domain, *w);
    let mut drivers: BTreeMap<WireId, usize> = (0..module.domain.reserved()).map(|w| (w, 1)).collect();
    let driven = module
        .inputs
        .iter()
        .copied()
        .filter(|w| !constant(w))
        .chain(module.gates.iter().map(|g| g.output))
        .chain(
            module
                .instances
                .iter()
                .flat_map(|i| i.outputs.iter().map(|p| p.0))
                .filter(|w| !constant(w)),
        );
    for wire in driven {
        *drivers.entry(wire).or_insert(0) += 1;
    }

    let inputs: BTreeSet<WireId> = module.inputs.iter().copied().collect();
    let findings = vec![
        (DiagnosticKind::UndrivenOutput, undriven(&mut module.outputs.iter().copied())),
        (DiagnosticKind::UndrivenGateInput, undriven(&mut module.gate_inputs.iter().copied())),
        (
            DiagnosticKind::MultiplyDriven,
            drivers.into_iter().filter(|(_, n)| *n > 1).map(|(w, _)| w).collect(),
        ),
        (
            DiagnosticKind::AliasConflict,
            module
                .outputs
                .iter()
                .filter(|w| inputs.contains(*w))
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        ),
        (
            DiagnosticKind::UndrivenSubcircuitInput,
            undriven(&mut module.subcircuit_inputs.iter().copied()),
        ),
    ];
    findings.into_iter().filter(|(_, wires)| !wires.is_empty()).collect()
}

/// Whether a module passes every check. Warnings count as failures.
pub fn check(module: &Module) -> bool {
    lint_module(module).is_empty()
}

/// The Linter collects diagnostics over the modules of a netlist.
#[derive(Clone, Debug, Default)]
pub struct Linter {
    diagnostics: Vec<Diagnostic>,
    modules_checked: usize,
}

impl Linter {
    pub fn new() -> Linter {
        Linter::default()
    }

    pub fn print_implemented_checks() {
        println!("{}", IMPLEMENTED_CHECKS);
    }

    /// Lint every module of the graph. Returns true if all of them pass.
    pub fn ingest_graph(&mut self, graph: &ModuleGraph) -> bool {
        let mut all_okay = true;
        for module in graph.modules() {
            all_okay &= self.ingest_module(module, &graph.allocator);
        }
        all_okay
    }

    pub fn ingest_module(&mut self, module: &Module, allocator: &WireAllocator) -> bool {
        self.modules_checked += 1;
        let findings = lint_module(module);
        for (kind, wires) in &findings {
            let diagnostic = Diagnostic {
                severity: kind.severity(),
                kind: *kind,
                module: module.name.clone(),
                wires: wires.iter().map(|w| allocator.describe(*w)).collect(),
            };
            match diagnostic.severity {
                Severity::Warning => tracing::warn!("{}", diagnostic),
                Severity::Error => tracing::error!("{}", diagnostic),
            }
            self.diagnostics.push(diagnostic);
        }
        findings.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn modules_checked(&self) -> usize {
        self.modules_checked
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }

    pub fn get_violations(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_string()).collect()
    }

    /// Turn a failed lint into an error, so that the netlist is not flattened.
    pub fn ensure_clean(&self, netlist: &str) -> NetlistResult<()> {
        match self.diagnostics.first() {
            None => Ok(()),
            Some(first) => Err(NetlistError::LintFailed {
                module: netlist.to_string(),
                errors: self.count(Severity::Error),
                warnings: self.count(Severity::Warning),
                first: Box::new(first.to_error()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::blif::{parse_blif, ParseOptions};
    use crate::producers::examples::*;
    use crate::structs::wire::Domain;

    fn lint(text: &str) -> Linter {
        let graph = parse_blif(text, Domain::Boolean, &ParseOptions::default()).unwrap();
        let mut linter = Linter::new();
        linter.ingest_graph(&graph);
        linter
    }

    #[test]
    fn test_clean_netlists() {
        for text in &[example_and_blif(), example_hierarchy_blif()] {
            let linter = lint(text);
            assert!(linter.diagnostics().is_empty());
            assert!(linter.ensure_clean("example").is_ok());
        }
    }

    #[test]
    fn test_undriven_output() {
        let graph = parse_blif(example_undriven_blif(), Domain::Boolean, &ParseOptions::default()).unwrap();
        let top = graph.top().unwrap();
        assert!(!check(top));

        let mut linter = Linter::new();
        assert!(!linter.ingest_graph(&graph));
        assert_eq!(
            linter.diagnostics(),
            &[Diagnostic {
                severity: Severity::Warning,
                kind: DiagnosticKind::UndrivenOutput,
                module: "top".to_string(),
                wires: vec!["q".to_string()],
            }]
        );
        match linter.ensure_clean("top") {
            Err(NetlistError::LintFailed {
                errors: 0,
                warnings: 1,
                first,
                ..
            }) => match *first {
                NetlistError::UndrivenWire { module, wire } => assert_eq!((module, wire), ("top".to_string(), "q".to_string())),
                other => panic!("expected UndrivenWire, got {:?}", other),
            },
            other => panic!("expected LintFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_multiply_driven() {
        let text = "\
.model top
.inputs a b
.outputs y
.gate AND A=a B=b Y=y
.gate XOR A=a B=b Y=y
.gate INV A=b Y=a
.gate BUF A=b Y=$true
.end
";
        let linter = lint(text);
        assert_eq!(
            linter.diagnostics(),
            &[Diagnostic {
                severity: Severity::Error,
                kind: DiagnosticKind::MultiplyDriven,
                module: "top".to_string(),
                wires: vec!["$true".to_string(), "a".to_string(), "y".to_string()],
            }]
        );
        assert!(matches!(
            linter.ensure_clean("top"),
            Err(NetlistError::LintFailed { errors: 1, warnings: 0, .. })
        ));

        // Two instances driving the same wire.
        let text = "\
.model top
.inputs a
.outputs y
.subckt leaf i=a o=y
.subckt leaf i=a o=y
.end
.model leaf
.inputs i
.outputs o
.gate INV A=i Y=o
.end
";
        let graph = parse_blif(text, Domain::Boolean, &ParseOptions::default()).unwrap();
        let top = graph.top().unwrap();
        assert_eq!(lint_module(top), vec![(DiagnosticKind::MultiplyDriven, vec![3])]);
        assert!(!check(top));
    }

    #[test]
    fn test_every_check() {
        let text = "\
.model top
.inputs a b
.outputs b y z
.gate AND A=a B=ghost Y=y
.subckt leaf i=phantom o=z
.end
.model leaf
.inputs i
.outputs o
.gate INV A=i Y=o
.end
";
        let linter = lint(text);
        let kinds: Vec<_> = linter.diagnostics().iter().map(|d| (d.kind, d.wires.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (DiagnosticKind::UndrivenGateInput, vec!["ghost".to_string()]),
                (DiagnosticKind::AliasConflict, vec!["b".to_string()]),
                (DiagnosticKind::UndrivenSubcircuitInput, vec!["phantom".to_string()]),
            ]
        );
        assert_eq!(linter.count(Severity::Error), 1);
        assert_eq!(linter.count(Severity::Warning), 2);
        assert_eq!(linter.modules_checked(), 2);
    }

    #[test]
    fn test_constants_are_driven() {
        let text = ".model top\n.inputs a\n.outputs y\n.gate AND A=a B=$true Y=y\n.end\n";
        assert!(lint(text).diagnostics().is_empty());
    }
}
