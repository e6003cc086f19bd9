use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::structs::composite::{CompositeCircuit, CompositeOp};
use crate::structs::flat::FlatCircuit;
use crate::structs::gates::{Gate, GateOp};
use crate::structs::graph::ModuleGraph;
use crate::WireId;

#[derive(Clone, Default, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct GateStats {
    pub and_gates: usize,
    pub xor_gates: usize,
    pub inv_gates: usize,
    pub buf_gates: usize,
    /// Opaque technology cells, by name.
    pub cell_gates: BTreeMap<String, usize>,
}

impl GateStats {
    fn ingest_gate(&mut self, gate: &Gate) {
        match &gate.op {
            GateOp::And => self.and_gates += 1,
            GateOp::Xor => self.xor_gates += 1,
            GateOp::Inv => self.inv_gates += 1,
            GateOp::Buf => self.buf_gates += 1,
            GateOp::Cell(name) => *self.cell_gates.entry(name.clone()).or_insert(0) += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.and_gates + self.xor_gates + self.inv_gates + self.buf_gates + self.cell_gates.values().sum::<usize>()
    }
}

#[derive(Clone, Default, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Stats {
    // Hierarchy.
    pub modules: usize,
    pub instances: usize,

    // Flat circuit.
    pub inputs: usize,
    pub outputs: usize,
    pub wires: u64,
    pub gate_stats: GateStats,

    // Composite circuit.
    pub boolean_wires: usize,
    pub arithmetic_wires: usize,
    pub arithmetic_gates: GateStats,
    pub bridges: usize,
    pub assert_zero: usize,
}

impl Stats {
    /// Count the modules and instances of a netlist, before flattening.
    pub fn ingest_graph(&mut self, graph: &ModuleGraph) {
        for module in graph.modules() {
            self.modules += 1;
            self.instances += module.instances.len();
        }
    }

    pub fn ingest_flat(&mut self, circuit: &FlatCircuit) {
        self.inputs += circuit.inputs.len();
        self.outputs += circuit.outputs.len();
        self.wires = self.wires.max(circuit.wire_count());
        for gate in &circuit.gates {
            self.gate_stats.ingest_gate(gate);
        }
    }

    /// Count the operations of a composite circuit, and the distinct wires used on each side.
    pub fn ingest_composite(&mut self, composite: &CompositeCircuit) {
        let mut boolean: BTreeSet<WireId> = BTreeSet::new();
        let mut arithmetic: BTreeSet<WireId> = BTreeSet::new();

        for op in &composite.ops {
            match op {
                CompositeOp::SizeHint { .. } => {}
                CompositeOp::Input(wire) => {
                    self.inputs += 1;
                    boolean.insert(*wire);
                }
                CompositeOp::Boolean(gate) => {
                    self.gate_stats.ingest_gate(gate);
                    boolean.extend(gate.wires());
                }
                CompositeOp::Bridge(bridge) => {
                    self.bridges += 1;
                    boolean.extend(bridge.boolean.clone());
                    arithmetic.insert(bridge.arithmetic);
                }
                CompositeOp::Arithmetic(gate) => {
                    self.arithmetic_gates.ingest_gate(gate);
                    arithmetic.extend(gate.wires());
                }
                CompositeOp::AssertZero(wire) => {
                    self.assert_zero += 1;
                    arithmetic.insert(*wire);
                }
            }
        }
        self.boolean_wires += boolean.len();
        self.arithmetic_wires += arithmetic.len();
    }
}

#[test]
fn test_stats() {
    use crate::consumers::flattening::flatten;
    use crate::producers::blif::{parse_blif, ParseOptions};
    use crate::producers::examples::*;
    use crate::structs::wire::Domain;

    let graph = parse_blif(example_hierarchy_blif(), Domain::Boolean, &ParseOptions::default()).unwrap();
    let flat = flatten(&graph).unwrap();

    let mut stats = Stats::default();
    stats.ingest_graph(&graph);
    stats.ingest_flat(&flat);

    let expected = Stats {
        modules: 2,
        instances: 2,
        inputs: 3,
        outputs: 2,
        wires: flat.wire_count(),
        gate_stats: GateStats {
            and_gates: 2,
            inv_gates: 2,
            ..GateStats::default()
        },
        ..Stats::default()
    };
    assert_eq!(expected, stats);
    assert_eq!(stats.gate_stats.total(), 4);
}
