use crate::error::{NetlistError, NetlistResult};
use crate::producers::blif::ParseOptions;
use crate::structs::gates::{Gate, GateOp};
use crate::structs::graph::ModuleGraph;
use crate::structs::module::{Module, SubcircuitInstance};
use crate::structs::wire::{Domain, WireAllocator, WireId, FALSE_NAME, TRUE_NAME};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// A bit of a Yosys port or connection: a net number, or a constant given as a string.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
enum Bit {
    Net(u64),
    Constant(String),
}

#[derive(Clone, Debug, Deserialize)]
struct Port {
    direction: String,
    bits: Vec<Bit>,
}

#[derive(Clone, Debug, Deserialize)]
struct Cell {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    port_directions: Value,
    #[serde(default)]
    connections: Value,
}

struct JsonModule {
    name: String,
    ports: Vec<(String, Port)>,
    cells: Vec<(String, Cell)>,
}

fn json_error(err: serde_json::Error) -> NetlistError {
    NetlistError::parse(err.line(), err.to_string())
}

/// Decode the members of a JSON object, keeping their order.
fn entries<T: DeserializeOwned>(value: &Value, what: &str) -> NetlistResult<Vec<(String, T)>> {
    match value {
        Value::Null => Ok(vec![]),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let decoded = serde_json::from_value(v.clone())
                    .map_err(|e| NetlistError::parse(0, format!("{} '{}': {}", what, k, e)))?;
                Ok((k.clone(), decoded))
            })
            .collect(),
        _ => Err(NetlistError::parse(0, format!("{} must be an object", what))),
    }
}

/// Parse a Yosys JSON netlist into a module graph and resolve instance directions.
///
/// Port bits are reversed per port, like BLIF buses. Cells whose type names another
/// module of the file become subcircuit instances; every other cell becomes one gate
/// per output bit. Without `options.top`, the module with the most cells is the top.
pub fn parse_json(text: &str, domain: Domain, options: &ParseOptions) -> NetlistResult<ModuleGraph> {
    parse_json_with(text, WireAllocator::new(domain), options)
}

pub fn parse_json_with(
    text: &str,
    allocator: WireAllocator,
    options: &ParseOptions,
) -> NetlistResult<ModuleGraph> {
    let root: Value = serde_json::from_str(text).map_err(json_error)?;
    let raw_modules = root
        .get("modules")
        .ok_or_else(|| NetlistError::parse(0, "missing 'modules'"))?;

    let mut modules = vec![];
    for (name, body) in entries::<Value>(raw_modules, "module")? {
        modules.push(JsonModule {
            ports: entries(body.get("ports").unwrap_or(&Value::Null), "port")?,
            cells: entries(body.get("cells").unwrap_or(&Value::Null), "cell")?,
            name,
        });
    }

    let by_name: HashMap<&str, &JsonModule> = modules.iter().map(|m| (m.name.as_str(), m)).collect();
    let mut graph = ModuleGraph::with_allocator(allocator);
    for json_module in &modules {
        let module = build_module(json_module, &by_name, &mut graph.allocator)?;
        graph.insert(module);
    }

    match &options.top {
        Some(top) => graph.set_top(top)?,
        None => {
            let mut busiest: Option<&JsonModule> = None;
            for m in &modules {
                if busiest.map_or(true, |b| m.cells.len() > b.cells.len()) {
                    busiest = Some(m);
                }
            }
            if let Some(m) = busiest {
                graph.set_top(&m.name)?;
            }
        }
    }

    graph.resolve_directions()?;
    Ok(graph)
}

fn wire_for(bit: &Bit, allocator: &mut WireAllocator) -> NetlistResult<WireId> {
    match bit {
        Bit::Net(n) => allocator.id_for(&n.to_string()),
        Bit::Constant(c) if c == "0" => allocator.id_for(FALSE_NAME),
        Bit::Constant(c) if c == "1" => allocator.id_for(TRUE_NAME),
        Bit::Constant(c) => Err(NetlistError::parse(0, format!("unsupported constant bit '{}'", c))),
    }
}

fn build_module(
    json_module: &JsonModule,
    by_name: &HashMap<&str, &JsonModule>,
    allocator: &mut WireAllocator,
) -> NetlistResult<Module> {
    let mut module = Module::new(json_module.name.as_str(), allocator.domain());

    for (name, port) in &json_module.ports {
        for bit in port.bits.iter().rev() {
            let wire = wire_for(bit, allocator)?;
            match &port.direction[..] {
                "input" => module.add_input(wire),
                "output" => module.add_output(wire),
                "inout" => {
                    module.add_input(wire);
                    module.add_output(wire);
                }
                other => {
                    return Err(NetlistError::parse(
                        0,
                        format!("port '{}' has unknown direction '{}'", name, other),
                    ))
                }
            }
        }
    }

    for (cell_name, cell) in &json_module.cells {
        let connections: Vec<(String, Vec<Bit>)> = entries(&cell.connections, "connection")?;

        if let Some(callee) = by_name.get(cell.kind.as_str()) {
            let mut pairings = vec![];
            for (port_name, bits) in &connections {
                let callee_port = callee
                    .ports
                    .iter()
                    .find(|(name, _)| name == port_name)
                    .map(|(_, port)| port)
                    .ok_or_else(|| {
                        NetlistError::parse(
                            0,
                            format!("cell '{}': module '{}' has no port '{}'", cell_name, callee.name, port_name),
                        )
                    })?;
                if callee_port.bits.len() != bits.len() {
                    return Err(NetlistError::parse(
                        0,
                        format!("cell '{}': port '{}' width mismatch", cell_name, port_name),
                    ));
                }
                for (caller_bit, callee_bit) in bits.iter().zip(callee_port.bits.iter()) {
                    pairings.push((wire_for(caller_bit, allocator)?, wire_for(callee_bit, allocator)?));
                }
            }
            module.add_instance(SubcircuitInstance::new(callee.name.as_str(), pairings));
            continue;
        }

        let directions: HashMap<String, String> = entries(&cell.port_directions, "port direction")?
            .into_iter()
            .collect();
        let mut inputs = vec![];
        let mut outputs = vec![];
        for (port_name, bits) in &connections {
            let wires = bits
                .iter()
                .map(|b| wire_for(b, allocator))
                .collect::<NetlistResult<Vec<_>>>()?;
            match directions.get(port_name).map(|d| d.as_str()) {
                Some("output") => outputs.extend(wires),
                Some("input") => inputs.extend(wires),
                _ => {
                    return Err(NetlistError::parse(
                        0,
                        format!("cell '{}': port '{}' has no usable direction", cell_name, port_name),
                    ))
                }
            }
        }

        let op = GateOp::parse(&cell.kind);
        if let Some(arity) = op.arity() {
            if inputs.len() != arity {
                return Err(NetlistError::parse(
                    0,
                    format!("cell '{}': {} takes {} inputs, got {}", cell_name, op, arity, inputs.len()),
                ));
            }
        }
        for output in outputs {
            module.add_gate(Gate::new(op.clone(), inputs.clone(), output));
        }
    }

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::examples::*;
    use crate::structs::wire::TRUE_WIRE;

    #[test]
    fn test_parse_hierarchy() {
        let graph = parse_json(example_hierarchy_json(), Domain::Boolean, &ParseOptions::default()).unwrap();
        assert_eq!(graph.len(), 2);
        // "top" has the most cells.
        let top = graph.top().unwrap();
        assert_eq!(top.name, "top");
        assert_eq!(top.inputs.len(), 3);
        assert_eq!(top.outputs.len(), 2);
        assert_eq!(top.instances.len(), 3);
        assert_eq!(top.instances[2].inputs[1].0, TRUE_WIRE);
        assert_eq!(top.subcircuit_outputs.len(), 3);

        let and_inv = graph.get("and_inv").unwrap();
        assert_eq!(and_inv.gates.len(), 2);
        assert_eq!(and_inv.gates[0].op, GateOp::And);
        assert_eq!(and_inv.gates[1].op, GateOp::Inv);
    }

    #[test]
    fn test_bits_are_reversed() {
        let text = r#"{"modules": {"m": {
            "ports": {
                "a": {"direction": "input", "bits": [2, 3, 4]},
                "y": {"direction": "output", "bits": [5]}
            },
            "cells": {}
        }}}"#;
        let graph = parse_json(text, Domain::Boolean, &ParseOptions::default()).unwrap();
        let alloc = &graph.allocator;
        let names: Vec<_> = graph.top().unwrap().inputs.iter().map(|w| alloc.describe(*w)).collect();
        assert_eq!(names, vec!["4", "3", "2"]);
    }

    #[test]
    fn test_multi_output_cell() {
        let text = r#"{"modules": {"m": {
            "ports": {"a": {"direction": "input", "bits": [2]}},
            "cells": {"fanout": {
                "type": "DUP",
                "port_directions": {"A": "input", "Y": "output"},
                "connections": {"A": [2], "Y": [3, 4]}
            }}
        }}}"#;
        let graph = parse_json(text, Domain::Boolean, &ParseOptions::default()).unwrap();
        let gates = &graph.top().unwrap().gates;
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].inputs, gates[1].inputs);
        assert_ne!(gates[0].output, gates[1].output);
    }

    #[test]
    fn test_errors() {
        let undefined = r#"{"modules": {"m": {"ports": {"a": {"direction": "input", "bits": ["x"]}}}}}"#;
        assert!(matches!(
            parse_json(undefined, Domain::Boolean, &ParseOptions::default()),
            Err(NetlistError::ParseError { .. })
        ));

        let options = ParseOptions {
            top: Some("nope".to_string()),
        };
        assert!(matches!(
            parse_json(example_hierarchy_json(), Domain::Boolean, &options),
            Err(NetlistError::UnresolvedSubcircuit { .. })
        ));

        assert!(matches!(
            parse_json("{ not json", Domain::Boolean, &ParseOptions::default()),
            Err(NetlistError::ParseError { line: 1, .. })
        ));
    }
}
