use crate::error::{NetlistError, NetlistResult};
use crate::structs::module::Module;
use crate::structs::wire::{is_constant_wire, Domain, WireAllocator};
use std::collections::{HashMap, HashSet};

/// ModuleGraph stores the modules of one netlist by name, along with the allocator
/// that numbered their wires.
///
/// Modules may reference modules declared later in the file, so instance
/// directions are resolved in a separate pass once everything is known.
#[derive(Clone, Debug)]
pub struct ModuleGraph {
    pub allocator: WireAllocator,
    modules: Vec<Module>,
    index: HashMap<String, usize>,
    top: Option<String>,
    resolved: bool,
}

impl ModuleGraph {
    pub fn new(domain: Domain) -> ModuleGraph {
        ModuleGraph::with_allocator(WireAllocator::new(domain))
    }

    pub fn with_allocator(allocator: WireAllocator) -> ModuleGraph {
        ModuleGraph {
            allocator,
            modules: vec![],
            index: HashMap::new(),
            top: None,
            resolved: false,
        }
    }

    pub fn domain(&self) -> Domain {
        self.allocator.domain()
    }

    /// Add a module. The first module added becomes the top unless `set_top` says otherwise.
    /// Returns false if a module with this name already exists.
    pub fn insert(&mut self, module: Module) -> bool {
        if self.index.contains_key(&module.name) {
            return false;
        }
        if self.top.is_none() {
            self.top = Some(module.name.clone());
        }
        self.index.insert(module.name.clone(), self.modules.len());
        self.modules.push(module);
        self.resolved = false;
        true
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|i| &self.modules[*i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Modules in declaration order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn top_name(&self) -> Option<&str> {
        self.top.as_deref()
    }

    pub fn top(&self) -> NetlistResult<&Module> {
        let name = self.top.as_deref().unwrap_or("");
        self.get(name)
            .ok_or_else(|| NetlistError::UnresolvedSubcircuit {
                callee: name.to_string(),
                parent: "<top>".to_string(),
            })
    }

    pub fn set_top(&mut self, name: &str) -> NetlistResult<()> {
        if !self.contains(name) {
            return Err(NetlistError::UnresolvedSubcircuit {
                callee: name.to_string(),
                parent: "<top>".to_string(),
            });
        }
        self.top = Some(name.to_string());
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Split the pairings of every instance into input-facing and output-facing ones,
    /// according to the ports of the callee. A pairing facing both ways lands in both.
    ///
    /// The per-module subcircuit sets are rebuilt from scratch, so running this twice
    /// gives the same result.
    pub fn resolve_directions(&mut self) -> NetlistResult<()> {
        for m in 0..self.modules.len() {
            let mut resolved = Vec::with_capacity(self.modules[m].instances.len());

            for instance in &self.modules[m].instances {
                let callee = self.get(&instance.callee).ok_or_else(|| {
                    NetlistError::UnresolvedSubcircuit {
                        callee: instance.callee.clone(),
                        parent: self.modules[m].name.clone(),
                    }
                })?;
                let callee_inputs: HashSet<_> = callee.inputs.iter().collect();
                let callee_outputs: HashSet<_> = callee.outputs.iter().collect();

                let mut inputs = vec![];
                let mut outputs = vec![];
                for &(caller_wire, callee_wire) in &instance.pairings {
                    let is_input = callee_inputs.contains(&callee_wire);
                    let is_output = callee_outputs.contains(&callee_wire);
                    if !is_input && !is_output {
                        return Err(NetlistError::UnmatchedPairing {
                            module: self.modules[m].name.clone(),
                            callee: callee.name.clone(),
                            wire: self.allocator.describe(callee_wire),
                        });
                    }
                    // A port tied to a constant inside the callee can only meet the same constant,
                    // or be read by the caller.
                    let domain = self.allocator.domain();
                    if is_constant_wire(domain, callee_wire)
                        && caller_wire != callee_wire
                        && (is_input || is_constant_wire(domain, caller_wire))
                    {
                        return Err(NetlistError::ConstantPort {
                            module: self.modules[m].name.clone(),
                            callee: callee.name.clone(),
                            wire: self.allocator.describe(caller_wire),
                        });
                    }
                    if is_input {
                        inputs.push((caller_wire, callee_wire));
                    }
                    if is_output {
                        outputs.push((caller_wire, callee_wire));
                    }
                }
                resolved.push((inputs, outputs));
            }

            let module = &mut self.modules[m];
            module.subcircuit_inputs.clear();
            module.subcircuit_outputs.clear();
            for (instance, (inputs, outputs)) in module.instances.iter_mut().zip(resolved) {
                module.subcircuit_inputs.extend(inputs.iter().map(|p| p.0));
                module.subcircuit_outputs.extend(outputs.iter().map(|p| p.0));
                instance.inputs = inputs;
                instance.outputs = outputs;
            }
        }
        self.resolved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::gates::Gate;
    use crate::structs::module::SubcircuitInstance;
    use crate::structs::wire::TRUE_WIRE;

    fn two_level_graph() -> ModuleGraph {
        let mut graph = ModuleGraph::new(Domain::Boolean);
        let a = graph.allocator.id_for("a").unwrap();
        let b = graph.allocator.id_for("b").unwrap();
        let y = graph.allocator.id_for("y").unwrap();
        let x = graph.allocator.id_for("x").unwrap();
        let z = graph.allocator.id_for("z").unwrap();

        let mut top = Module::new("top", Domain::Boolean);
        top.add_input(a);
        top.add_input(b);
        top.add_output(y);
        top.add_instance(SubcircuitInstance::new("and2", vec![(a, x), (b, z), (y, a)]));

        // Declared after its caller.
        let mut and2 = Module::new("and2", Domain::Boolean);
        and2.add_input(x);
        and2.add_input(z);
        and2.add_output(a);
        and2.add_gate(Gate::and(x, z, a));

        graph.insert(top);
        graph.insert(and2);
        graph
    }

    #[test]
    fn test_resolve_forward_reference() {
        let mut graph = two_level_graph();
        graph.resolve_directions().unwrap();
        let top = graph.top().unwrap();
        assert_eq!(top.subcircuit_inputs.iter().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(top.subcircuit_outputs.iter().copied().collect::<Vec<_>>(), vec![4]);
        assert!(top.is_driven(4));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut graph = two_level_graph();
        graph.resolve_directions().unwrap();
        let once = graph.top().unwrap().clone();
        graph.resolve_directions().unwrap();
        assert_eq!(graph.top().unwrap(), &once);
    }

    #[test]
    fn test_unresolved_callee() {
        let mut graph = ModuleGraph::new(Domain::Boolean);
        let mut top = Module::new("top", Domain::Boolean);
        top.add_instance(SubcircuitInstance::new("missing", vec![]));
        graph.insert(top);
        match graph.resolve_directions() {
            Err(NetlistError::UnresolvedSubcircuit { callee, parent }) => {
                assert_eq!(callee, "missing");
                assert_eq!(parent, "top");
            }
            other => panic!("expected UnresolvedSubcircuit, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_port() {
        let tied_graph = |caller_wire: Option<&str>| {
            let mut graph = ModuleGraph::new(Domain::Boolean);
            let caller = match caller_wire {
                Some(name) => graph.allocator.id_for(name).unwrap(),
                None => TRUE_WIRE,
            };
            let mut top = Module::new("top", Domain::Boolean);
            top.add_input(caller);
            top.add_instance(SubcircuitInstance::new("tied", vec![(caller, TRUE_WIRE)]));
            let mut tied = Module::new("tied", Domain::Boolean);
            tied.add_input(TRUE_WIRE);
            graph.insert(top);
            graph.insert(tied);
            graph
        };

        match tied_graph(Some("a")).resolve_directions() {
            Err(NetlistError::ConstantPort { module, callee, wire }) => {
                assert_eq!((module.as_str(), callee.as_str(), wire.as_str()), ("top", "tied", "a"));
            }
            other => panic!("expected ConstantPort, got {:?}", other),
        }
        // Binding the same constant is fine.
        assert!(tied_graph(None).resolve_directions().is_ok());
    }

    #[test]
    fn test_unmatched_pairing() {
        let mut graph = two_level_graph();
        let stray = graph.allocator.id_for("stray").unwrap();
        let mut caller = Module::new("caller", Domain::Boolean);
        caller.add_instance(SubcircuitInstance::new("and2", vec![(stray, stray)]));
        graph.insert(caller);
        match graph.resolve_directions() {
            Err(NetlistError::UnmatchedPairing { wire, .. }) => assert_eq!(wire, "stray"),
            other => panic!("expected UnmatchedPairing, got {:?}", other),
        }
    }
}
