use crate::error::{NetlistError, NetlistResult};
use crate::structs::flat::FlatCircuit;
use crate::structs::gates::Gate;
use crate::structs::graph::ModuleGraph;
use crate::structs::module::{Module, SubcircuitInstance};
use crate::structs::wire::{is_constant_wire, Domain, WireId};
use std::collections::HashMap;

/// Flatten the top module of the graph.
///
/// # Example
/// ```
/// use bristolify::consumers::flattening::flatten;
/// use bristolify::producers::blif::{parse_blif, ParseOptions};
/// use bristolify::producers::examples::example_hierarchy_blif;
/// use bristolify::structs::wire::Domain;
///
/// let graph = parse_blif(example_hierarchy_blif(), Domain::Boolean, &ParseOptions::default()).unwrap();
/// let flat = flatten(&graph).unwrap();
/// assert!(flat.is_flat());
/// assert_eq!(flat.gate_count(), 4);
/// ```
pub fn flatten(graph: &ModuleGraph) -> NetlistResult<FlatCircuit> {
    let top = graph.top()?;
    Flattener::new(graph).flatten(&top.name)
}

/// Translation of the wires of one active instance into the flat wire space.
struct Scope {
    translation: HashMap<WireId, WireId>,
}

/// Inlines subcircuit instances recursively.
///
/// Wires bound by a pairing take the ID of the caller's wire. Every other wire of a callee
/// gets a fresh ID above everything the allocator handed out. Scopes are kept for the
/// chain of instances being expanded, and dropped once an instance is done.
pub struct Flattener<'g> {
    graph: &'g ModuleGraph,
    domain: Domain,
    free_temporary_wire: WireId,
    scopes: Vec<Scope>,
    active: Vec<&'g str>,
    gates: Vec<Gate>,
}

impl<'g> Flattener<'g> {
    pub fn new(graph: &'g ModuleGraph) -> Flattener<'g> {
        Flattener {
            graph,
            domain: graph.domain(),
            free_temporary_wire: graph.allocator.next_id(),
            scopes: vec![],
            active: vec![],
            gates: vec![],
        }
    }

    pub fn flatten(mut self, name: &str) -> NetlistResult<FlatCircuit> {
        let graph = self.graph;
        let top = graph.get(name).ok_or_else(|| NetlistError::UnresolvedSubcircuit {
            callee: name.to_string(),
            parent: "<top>".to_string(),
        })?;

        self.active.push(&top.name);
        self.gates.extend(top.gates.iter().cloned());
        for instance in &top.instances {
            self.expand(instance, None)?;
        }

        let mut module = Module::new(top.name.as_str(), top.domain);
        module.inputs = top.inputs.clone();
        module.outputs = top.outputs.clone();
        module.gates = self.gates;
        tracing::info!(
            "Flattened '{}' into {} gates, wires up to {}",
            module.name,
            module.gates.len(),
            self.free_temporary_wire
        );
        Ok(FlatCircuit::from_gates(module))
    }

    /// Map a wire of the scope at `depth` to the flat wire space. The top scope is the identity.
    fn translate(&mut self, depth: Option<usize>, wire: WireId) -> WireId {
        let depth = match depth {
            Some(depth) if !is_constant_wire(self.domain, wire) => depth,
            _ => return wire,
        };
        let free = &mut self.free_temporary_wire;
        *self.scopes[depth].translation.entry(wire).or_insert_with(|| {
            let temp = *free;
            *free += 1;
            temp
        })
    }

    fn expand(&mut self, instance: &'g SubcircuitInstance, parent: Option<usize>) -> NetlistResult<()> {
        let graph = self.graph;
        let caller = self.active.last().copied().unwrap_or("<top>");
        let callee = graph
            .get(&instance.callee)
            .ok_or_else(|| NetlistError::UnresolvedSubcircuit {
                callee: instance.callee.clone(),
                parent: caller.to_string(),
            })?;

        if self.active.contains(&callee.name.as_str()) {
            return Err(NetlistError::RecursiveInstance {
                module: callee.name.clone(),
                path: format!("{} -> {}", self.active.join(" -> "), callee.name),
            });
        }

        let mut translation = HashMap::new();
        for &(caller_wire, callee_wire) in &instance.pairings {
            let flat_wire = self.translate(parent, caller_wire);
            if is_constant_wire(self.domain, callee_wire) {
                // An output port tied to a constant inside the callee drives the caller's wire.
                if instance.outputs.contains(&(caller_wire, callee_wire)) && flat_wire != callee_wire {
                    self.gates.push(Gate::buf(callee_wire, flat_wire));
                }
                continue;
            }
            translation.insert(callee_wire, flat_wire);
        }
        for input in &callee.inputs {
            if !translation.contains_key(input) && !is_constant_wire(self.domain, *input) {
                tracing::warn!(
                    "Input '{}' of '{}' is not bound by its instance in '{}'",
                    graph.allocator.describe(*input),
                    callee.name,
                    caller
                );
            }
        }

        self.scopes.push(Scope { translation });
        self.active.push(&callee.name);
        let depth = Some(self.scopes.len() - 1);

        for gate in &callee.gates {
            let flat_gate = gate.renamed(|w| self.translate(depth, w));
            self.gates.push(flat_gate);
        }
        for inner in &callee.instances {
            self.expand(inner, depth)?;
        }

        self.active.pop();
        self.scopes.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::blif::{parse_blif, ParseOptions};
    use crate::producers::examples::*;
    use crate::producers::json::parse_json;
    use crate::structs::gates::GateOp;
    use crate::consumers::bristol::to_bristol_string;
    use crate::consumers::evaluator::evaluate;
    use crate::consumers::linter::check;
    use crate::structs::wire::{FALSE_WIRE, TRUE_WIRE};
    use std::collections::BTreeSet;

    fn parse(text: &str) -> ModuleGraph {
        parse_blif(text, Domain::Boolean, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_flat_module_is_unchanged() {
        let graph = parse(example_and_blif());
        let flat = flatten(&graph).unwrap();
        assert_eq!(&*flat, graph.top().unwrap());
    }

    #[test]
    fn test_two_instances_get_disjoint_wires() {
        let graph = parse(example_hierarchy_blif());
        let top = graph.top().unwrap().clone();
        let flat = flatten(&graph).unwrap();

        assert_eq!(flat.inputs, top.inputs);
        assert_eq!(flat.outputs, top.outputs);
        assert_eq!(flat.gate_count(), 4);
        assert!(flat.gates.iter().all(|g| g.op == GateOp::And || g.op == GateOp::Inv));

        // The AND output of each instance is an internal wire: fresh, and different per instance.
        let first = flat.gates[0].output;
        let second = flat.gates[2].output;
        assert!(first >= graph.allocator.next_id());
        assert!(second >= graph.allocator.next_id());
        assert_ne!(first, second);

        // Pairings substitute the caller's wires directly.
        let (a, b, c) = (top.inputs[0], top.inputs[1], top.inputs[2]);
        let (y, z) = (top.outputs[0], top.outputs[1]);
        assert_eq!(flat.gates[0].inputs, vec![a, b]);
        assert_eq!(flat.gates[1], Gate::inv(first, y));
        assert_eq!(flat.gates[2].inputs, vec![b, c]);
        assert_eq!(flat.gates[3], Gate::inv(second, z));
    }

    #[test]
    fn test_nested_instances() {
        let text = "\
.model top
.inputs a b
.outputs y
.subckt middle p=a q=b r=y
.end
.model middle
.inputs p q
.outputs r
.subckt leaf i=p o=s
.subckt leaf i=s o=t
.gate XOR A=t B=q Y=r
.end
.model leaf
.inputs i
.outputs o
.gate INV A=i Y=k
.gate INV A=k Y=o
.end
";
        let graph = parse(text);
        let mut flat = flatten(&graph).unwrap();
        assert_eq!(flat.gate_count(), 5);
        flat.sort_topologically().unwrap();

        let internal: BTreeSet<WireId> = flat
            .gates
            .iter()
            .map(|g| g.output)
            .filter(|w| !flat.outputs.contains(w))
            .collect();
        assert_eq!(internal.len(), 4);
        assert!(internal.iter().all(|w| *w >= graph.allocator.next_id()));
        assert_eq!(flat.gates.last().unwrap().op, GateOp::Xor);
    }

    #[test]
    fn test_constants_are_not_renamed() {
        let graph = parse_json(example_hierarchy_json(), Domain::Boolean, &ParseOptions::default()).unwrap();
        let flat = flatten(&graph).unwrap();
        assert_eq!(flat.gate_count(), 6);
        assert_eq!(flat.gates[4].inputs[1], TRUE_WIRE);
    }

    #[test]
    fn test_constant_output_port_drives_the_caller() {
        let graph = parse_json(example_constant_port_json(), Domain::Boolean, &ParseOptions::default()).unwrap();
        assert!(graph.modules().all(check));

        let flat = flatten(&graph).unwrap();
        assert_eq!(flat.gates, vec![Gate::buf(FALSE_WIRE, 3)]);

        let bristol = to_bristol_string(&flat).unwrap();
        assert_eq!(evaluate(&bristol, "011", false).unwrap(), vec![(3, false)]);
        assert_eq!(evaluate(&bristol, "1", true).unwrap(), vec![(3, false)]);
    }

    #[test]
    fn test_recursive_instance() {
        let text = ".model a\n.inputs x\n.outputs y\n.subckt b i=x o=y\n.end\n\
                    .model b\n.inputs i\n.outputs o\n.subckt a x=i y=o\n.end\n";
        match flatten(&parse(text)) {
            Err(NetlistError::RecursiveInstance { module, path }) => {
                assert_eq!(module, "a");
                assert_eq!(path, "a -> b -> a");
            }
            other => panic!("expected RecursiveInstance, got {:?}", other),
        }
    }
}
