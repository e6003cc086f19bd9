use crate::error::{NetlistError, NetlistResult};
use crate::structs::module::Module;
use crate::structs::wire::WireId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Deref;

/// A module without subcircuit instances, whose wire IDs are unique within one flattening run.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FlatCircuit {
    module: Module,
}

impl Deref for FlatCircuit {
    type Target = Module;

    fn deref(&self) -> &Module {
        &self.module
    }
}

impl FlatCircuit {
    /// Wrap a module that has no instances left.
    pub fn from_module(module: Module) -> Option<FlatCircuit> {
        if module.is_flat() {
            Some(FlatCircuit { module })
        } else {
            None
        }
    }

    /// Build a flat circuit from the ports of `module` and its gate list.
    /// Instances and subcircuit sets are discarded, gate bookkeeping is rebuilt.
    pub(crate) fn from_gates(module: Module) -> FlatCircuit {
        let mut flat = Module::new(module.name, module.domain);
        flat.inputs = module.inputs;
        flat.outputs = module.outputs;
        for gate in module.gates {
            flat.add_gate(gate);
        }
        FlatCircuit { module: flat }
    }

    pub fn into_module(self) -> Module {
        self.module
    }

    pub fn gate_count(&self) -> usize {
        self.module.gates.len()
    }

    /// The highest wire ID in use, constants excluded.
    pub fn max_wire(&self) -> Option<WireId> {
        self.module.wires().into_iter().next_back()
    }

    /// Size of the wire space: highest ID in use plus one, never less than the reserved constants.
    pub fn wire_count(&self) -> u64 {
        let reserved = self.module.domain.reserved();
        match self.max_wire() {
            Some(max) => (max + 1).max(reserved),
            None => reserved,
        }
    }

    /// Reorder the gates so that each gate comes after the gates driving its inputs.
    /// Among gates that are ready at the same time, the original order is kept.
    pub fn sort_topologically(&mut self) -> NetlistResult<()> {
        let gates = &self.module.gates;

        let mut drivers: HashMap<WireId, Vec<usize>> = HashMap::new();
        for (i, gate) in gates.iter().enumerate() {
            drivers.entry(gate.output).or_default().push(i);
        }

        let mut successors: Vec<Vec<usize>> = vec![vec![]; gates.len()];
        let mut pending = vec![0usize; gates.len()];
        for (i, gate) in gates.iter().enumerate() {
            for input in &gate.inputs {
                for &driver in drivers.get(input).map(|d| &d[..]).unwrap_or(&[]) {
                    successors[driver].push(i);
                    pending[i] += 1;
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..gates.len()).filter(|i| pending[*i] == 0).collect();
        let mut order = Vec::with_capacity(gates.len());
        while let Some(i) = ready.iter().next().copied() {
            ready.remove(&i);
            order.push(i);
            for &next in &successors[i] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.insert(next);
                }
            }
        }

        if order.len() < gates.len() {
            let stuck = (0..gates.len()).find(|i| pending[*i] > 0).unwrap_or(0);
            return Err(NetlistError::CombinationalLoop {
                wire: gates[stuck].output,
            });
        }

        let sorted = order.into_iter().map(|i| gates[i].clone()).collect();
        self.module.gates = sorted;
        Ok(())
    }

    /// Drop every gate that no output depends on. Inputs and outputs are kept as declared,
    /// and the surviving gates keep their order. Returns the number of gates removed.
    pub fn eliminate_dead_gates(&mut self) -> usize {
        let module = &mut self.module;
        let total = module.gates.len();

        let mut drivers: HashMap<WireId, Vec<usize>> = HashMap::new();
        for (i, gate) in module.gates.iter().enumerate() {
            drivers.entry(gate.output).or_default().push(i);
        }

        // Walk backwards from the outputs.
        let mut live = vec![false; total];
        let mut pending: Vec<WireId> = module.outputs.clone();
        let mut seen: HashSet<WireId> = pending.iter().copied().collect();
        while let Some(wire) = pending.pop() {
            for &i in drivers.get(&wire).map(|d| &d[..]).unwrap_or(&[]) {
                if live[i] {
                    continue;
                }
                live[i] = true;
                for &input in &module.gates[i].inputs {
                    if seen.insert(input) {
                        pending.push(input);
                    }
                }
            }
        }

        let gates = std::mem::take(&mut module.gates);
        module.gate_inputs.clear();
        module.gate_outputs.clear();
        for (gate, live) in gates.into_iter().zip(live) {
            if live {
                module.add_gate(gate);
            }
        }

        let dead = total - module.gates.len();
        if total > 0 {
            tracing::info!(
                "dead: {}, total: {} ({:.2}% circuit size reduction)",
                dead,
                total,
                (dead as f64) / (total as f64) * 100.
            );
        }
        dead
    }

    /// Renumber internal wires into a contiguous range just above the ports.
    /// Ports and constants keep their IDs.
    pub fn compact_wires(&mut self) {
        let module = &mut self.module;
        let reserved = module.domain.reserved();
        let frozen: BTreeSet<WireId> = module
            .inputs
            .iter()
            .chain(module.outputs.iter())
            .copied()
            .chain(0..reserved)
            .collect();

        let mut next = frozen.iter().next_back().map(|w| w + 1).unwrap_or(0);
        let mut renaming: HashMap<WireId, WireId> = HashMap::new();
        for gate in &module.gates {
            for wire in gate.wires() {
                if !frozen.contains(&wire) && !renaming.contains_key(&wire) {
                    renaming.insert(wire, next);
                    next += 1;
                }
            }
        }

        let rename = |w: WireId| *renaming.get(&w).unwrap_or(&w);
        let gates: Vec<_> = module.gates.iter().map(|g| g.renamed(rename)).collect();
        module.gates.clear();
        module.gate_inputs.clear();
        module.gate_outputs.clear();
        for gate in gates {
            module.add_gate(gate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::gates::Gate;
    use crate::structs::wire::Domain;

    fn circuit(gates: Vec<Gate>, inputs: &[WireId], outputs: &[WireId]) -> FlatCircuit {
        let mut module = Module::new("flat", Domain::Boolean);
        inputs.iter().for_each(|w| module.add_input(*w));
        outputs.iter().for_each(|w| module.add_output(*w));
        gates.into_iter().for_each(|g| module.add_gate(g));
        FlatCircuit::from_module(module).unwrap()
    }

    #[test]
    fn test_counts() {
        let flat = circuit(vec![Gate::and(2, 3, 4)], &[2, 3], &[4]);
        assert_eq!(flat.gate_count(), 1);
        assert_eq!(flat.wire_count(), 5);
        assert_eq!(circuit(vec![], &[], &[]).wire_count(), 2);
    }

    #[test]
    fn test_sort_topologically() {
        let mut flat = circuit(
            vec![Gate::inv(5, 6), Gate::and(2, 3, 5), Gate::xor(2, 3, 7)],
            &[2, 3],
            &[6, 7],
        );
        flat.sort_topologically().unwrap();
        assert_eq!(
            flat.gates,
            vec![Gate::and(2, 3, 5), Gate::inv(5, 6), Gate::xor(2, 3, 7)]
        );

        // Already sorted: nothing moves.
        let before = flat.clone();
        flat.sort_topologically().unwrap();
        assert_eq!(flat, before);
    }

    #[test]
    fn test_combinational_loop() {
        let mut flat = circuit(vec![Gate::inv(5, 6), Gate::inv(6, 5)], &[], &[6]);
        match flat.sort_topologically() {
            Err(NetlistError::CombinationalLoop { .. }) => {}
            other => panic!("expected CombinationalLoop, got {:?}", other),
        }
    }

    #[test]
    fn test_eliminate_dead_gates() {
        // 6 feeds the output through 7; 8 and 9 are computed but never used.
        let mut flat = circuit(
            vec![
                Gate::xor(6, 3, 4),
                Gate::and(2, 3, 8),
                Gate::inv(7, 6),
                Gate::inv(8, 9),
                Gate::buf(2, 7),
            ],
            &[2, 3],
            &[4],
        );
        assert_eq!(flat.eliminate_dead_gates(), 2);
        assert_eq!(flat.gates, vec![Gate::xor(6, 3, 4), Gate::inv(7, 6), Gate::buf(2, 7)]);
        assert_eq!(flat.inputs, vec![2, 3]);
        assert!(!flat.gate_outputs.contains(&8));
        assert!(!flat.gate_inputs.contains(&8));

        assert_eq!(flat.eliminate_dead_gates(), 0);
    }

    #[test]
    fn test_compact_wires() {
        let mut flat = circuit(
            vec![Gate::and(2, 3, 100), Gate::inv(100, 57), Gate::xor(57, 1, 4)],
            &[2, 3],
            &[4],
        );
        flat.compact_wires();
        assert_eq!(
            flat.gates,
            vec![Gate::and(2, 3, 5), Gate::inv(5, 6), Gate::xor(6, 1, 4)]
        );
        assert_eq!(flat.wire_count(), 7);
    }
}
