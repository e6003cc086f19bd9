use crate::structs::gates::Gate;
use crate::structs::wire::{is_constant_wire, Domain, WireId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An instantiation of another module.
///
/// `pairings` binds a wire of the caller to a port wire of the callee, as `(caller, callee)`.
/// The split into `inputs` and `outputs` is only known once every module has been parsed,
/// see `ModuleGraph::resolve_directions`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct SubcircuitInstance {
    pub callee: String,
    pub pairings: Vec<(WireId, WireId)>,
    pub inputs: Vec<(WireId, WireId)>,
    pub outputs: Vec<(WireId, WireId)>,
}

impl SubcircuitInstance {
    pub fn new(callee: impl Into<String>, pairings: Vec<(WireId, WireId)>) -> Self {
        SubcircuitInstance {
            callee: callee.into(),
            pairings,
            inputs: vec![],
            outputs: vec![],
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Module {
    pub name: String,
    pub domain: Domain,
    pub inputs: Vec<WireId>,
    pub outputs: Vec<WireId>,
    pub gates: Vec<Gate>,
    pub instances: Vec<SubcircuitInstance>,

    /// Wires written by a gate of this module.
    pub gate_outputs: BTreeSet<WireId>,
    /// Wires read by a gate of this module.
    pub gate_inputs: BTreeSet<WireId>,
    /// Caller wires feeding the inputs of an instance.
    pub subcircuit_inputs: BTreeSet<WireId>,
    /// Caller wires driven by the outputs of an instance.
    pub subcircuit_outputs: BTreeSet<WireId>,
}

impl Module {
    pub fn new(name: impl Into<String>, domain: Domain) -> Module {
        Module {
            name: name.into(),
            domain,
            inputs: vec![],
            outputs: vec![],
            gates: vec![],
            instances: vec![],
            gate_outputs: BTreeSet::new(),
            gate_inputs: BTreeSet::new(),
            subcircuit_inputs: BTreeSet::new(),
            subcircuit_outputs: BTreeSet::new(),
        }
    }

    /// Declare an input port. Repeated declarations are ignored.
    pub fn add_input(&mut self, wire: WireId) {
        if !self.inputs.contains(&wire) {
            self.inputs.push(wire);
        }
    }

    /// Declare an output port. Repeated declarations are ignored.
    pub fn add_output(&mut self, wire: WireId) {
        if !self.outputs.contains(&wire) {
            self.outputs.push(wire);
        }
    }

    pub fn add_gate(&mut self, gate: Gate) {
        self.gate_inputs.extend(gate.inputs.iter().copied());
        self.gate_outputs.insert(gate.output);
        self.gates.push(gate);
    }

    pub fn add_instance(&mut self, instance: SubcircuitInstance) {
        self.instances.push(instance);
    }

    /// Whether something gives `wire` a value in this module.
    pub fn is_driven(&self, wire: WireId) -> bool {
        is_constant_wire(self.domain, wire)
            || self.gate_outputs.contains(&wire)
            || self.subcircuit_outputs.contains(&wire)
            || self.inputs.contains(&wire)
    }

    pub fn is_flat(&self) -> bool {
        self.instances.is_empty()
    }

    /// Every wire referenced by the ports and gates of this module.
    pub fn wires(&self) -> BTreeSet<WireId> {
        let mut wires: BTreeSet<WireId> = self.inputs.iter().chain(self.outputs.iter()).copied().collect();
        for gate in &self.gates {
            wires.extend(gate.wires());
        }
        wires
    }
}

#[test]
fn test_module_bookkeeping() {
    let mut module = Module::new("m", Domain::Boolean);
    module.add_input(2);
    module.add_input(3);
    module.add_input(2);
    module.add_output(4);
    module.add_gate(Gate::and(2, 3, 4));

    assert_eq!(module.inputs, vec![2, 3]);
    assert!(module.gate_inputs.contains(&3));
    assert!(module.gate_outputs.contains(&4));
    assert!(module.is_driven(1));
    assert!(module.is_driven(4));
    assert!(!module.is_driven(5));
    assert!(module.is_flat());
    assert_eq!(module.wires().into_iter().collect::<Vec<_>>(), vec![2, 3, 4]);
}
