use crate::error::{NetlistError, NetlistResult};
use crate::producers::blif::{records, split_binding};
use crate::structs::composite::{CompositeCircuit, CompositeOp};
use crate::structs::connection::{Bridge, ConnectionSpec};
use crate::structs::flat::FlatCircuit;
use crate::structs::wire::{Domain, WireAllocator, WireId};

/// Name of the conversion gate in connection netlists, compared case-insensitively.
pub const BTOA: &str = "BtoA";

/// Read a connection netlist.
///
/// `bool_top` and `arith_top` name the two circuits, used as black-box `.gate`s whose
/// pins are wire names of each circuit. A `BtoA` gate takes the arithmetic wire first,
/// then the boolean wires it packs.
///
/// The allocators must be the ones that numbered the two circuits.
pub fn parse_connection(
    text: &str,
    bool_top: &str,
    arith_top: &str,
    bool_wires: &WireAllocator,
    arith_wires: &WireAllocator,
) -> NetlistResult<ConnectionSpec> {
    let mut spec = ConnectionSpec::default();
    // (line, arithmetic wire, boolean wires), translated once every black box is known.
    let mut conversions: Vec<(usize, String, Vec<String>)> = vec![];

    for record in records(text) {
        let line = record.line;
        match record.keyword() {
            ".model" | ".inputs" | ".outputs" | ".end" => {}

            ".subckt" => {
                return Err(NetlistError::NestedConnection {
                    callee: record.args().first().cloned().unwrap_or_default(),
                })
            }

            ".gate" => {
                let (op, bindings) = match record.args().split_first() {
                    Some(split) => split,
                    None => return Err(NetlistError::parse(line, ".gate needs an operator")),
                };

                if op == bool_top || op == arith_top {
                    let (allocator, table, side) = if op == bool_top {
                        (bool_wires, &mut spec.boolean_translation, "boolean")
                    } else {
                        (arith_wires, &mut spec.arithmetic_translation, "arithmetic")
                    };
                    for token in bindings {
                        let (pin, wire) = split_binding(token, line)?;
                        let local = allocator.lookup(pin).ok_or_else(|| NetlistError::UntranslatedWire {
                            wire: pin.to_string(),
                            side: side.to_string(),
                        })?;
                        table.insert(wire.to_string(), local);
                    }
                } else if op.eq_ignore_ascii_case(BTOA) {
                    let mut wires = vec![];
                    for token in bindings {
                        wires.push(split_binding(token, line)?.1.to_string());
                    }
                    if wires.is_empty() {
                        return Err(NetlistError::parse(line, "BtoA needs an arithmetic output"));
                    }
                    let arithmetic = wires.remove(0);
                    conversions.push((line, arithmetic, wires));
                } else {
                    return Err(NetlistError::UnknownOperator { op: op.clone() });
                }
            }

            keyword => {
                return Err(NetlistError::parse(line, format!("unknown keyword '{}'", keyword)));
            }
        }
    }

    for (line, arithmetic, boolean) in conversions {
        let arithmetic = spec.arithmetic_wire(&arithmetic)?;
        let boolean = boolean
            .iter()
            .map(|name| spec.boolean_wire(name))
            .collect::<NetlistResult<Vec<WireId>>>()?;
        let bridge = Bridge::new(arithmetic, &boolean)?;
        tracing::debug!(
            "line {}: bridge {:?} -> arithmetic wire {}",
            line,
            bridge.boolean,
            bridge.arithmetic
        );
        spec.bridges.push(bridge);
    }
    Ok(spec)
}

/// Join a flat boolean circuit and a flat arithmetic circuit into a composite circuit.
///
/// Order: size hint, boolean inputs (ascending), boolean gates, bridges, arithmetic gates,
/// and arithmetic outputs (ascending) asserted to zero. Gates are taken in their current order.
pub fn compose(
    boolean: &FlatCircuit,
    arithmetic: &FlatCircuit,
    connection: &ConnectionSpec,
) -> NetlistResult<CompositeCircuit> {
    for (circuit, expected) in &[(boolean, Domain::Boolean), (arithmetic, Domain::Arithmetic)] {
        if circuit.domain != *expected {
            return Err(NetlistError::DomainMismatch {
                operation: "Composition".to_string(),
                expected: *expected,
            });
        }
    }

    let mut ops = vec![CompositeOp::SizeHint {
        arithmetic: arithmetic.wire_count(),
        boolean: boolean.wire_count(),
    }];

    let mut inputs = boolean.inputs.clone();
    inputs.sort_unstable();
    ops.extend(inputs.into_iter().map(CompositeOp::Input));
    ops.extend(boolean.gates.iter().cloned().map(CompositeOp::Boolean));
    ops.extend(connection.bridges.iter().cloned().map(CompositeOp::Bridge));
    ops.extend(arithmetic.gates.iter().cloned().map(CompositeOp::Arithmetic));

    let mut outputs = arithmetic.outputs.clone();
    outputs.sort_unstable();
    ops.extend(outputs.into_iter().map(CompositeOp::AssertZero));

    tracing::info!(
        "Composed {} boolean gates, {} bridges and {} arithmetic gates",
        boolean.gate_count(),
        connection.bridges.len(),
        arithmetic.gate_count()
    );
    Ok(CompositeCircuit { ops })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::flattening::flatten;
    use crate::producers::blif::{parse_blif, ParseOptions};
    use crate::producers::examples::*;
    use crate::structs::connection::BRIDGE_WIDTH;
    use crate::structs::graph::ModuleGraph;

    fn circuits() -> (ModuleGraph, ModuleGraph) {
        let options = ParseOptions::default();
        (
            parse_blif(&example_boolean_word_blif(), Domain::Boolean, &options).unwrap(),
            parse_blif(example_arithmetic_blif(), Domain::Arithmetic, &options).unwrap(),
        )
    }

    fn connect(text: &str, boolean: &ModuleGraph, arithmetic: &ModuleGraph) -> NetlistResult<ConnectionSpec> {
        parse_connection(text, "bool_top", "arith_top", &boolean.allocator, &arithmetic.allocator)
    }

    #[test]
    fn test_single_bridge() {
        let (boolean, arithmetic) = circuits();
        let spec = connect(&example_connection_blif(), &boolean, &arithmetic).unwrap();
        assert_eq!(spec.bridges.len(), 1);

        let bool_flat = flatten(&boolean).unwrap();
        let arith_flat = flatten(&arithmetic).unwrap();

        // The output word y[63..0] is numbered right after the input word.
        let low = 2 + BRIDGE_WIDTH as WireId;
        let expected = Bridge {
            arithmetic: arithmetic.allocator.lookup("v").unwrap(),
            boolean: low..low + BRIDGE_WIDTH as WireId,
        };
        assert_eq!(spec.bridges[0], expected);

        let composite = compose(&bool_flat, &arith_flat, &spec).unwrap();
        assert_eq!(composite.bridges().collect::<Vec<_>>(), vec![&expected]);
        assert_eq!(
            composite.ops[0],
            CompositeOp::SizeHint {
                arithmetic: 2,
                boolean: 2 + 2 * BRIDGE_WIDTH as u64,
            }
        );
        assert_eq!(composite.ops[1], CompositeOp::Input(2));
        assert_eq!(composite.ops.len(), 1 + BRIDGE_WIDTH + BRIDGE_WIDTH + 1 + 1 + 1);
        assert_eq!(
            composite.ops.last(),
            Some(&CompositeOp::AssertZero(arithmetic.allocator.lookup("z").unwrap()))
        );
        assert!(matches!(
            composite.ops[1 + 2 * BRIDGE_WIDTH + 1],
            CompositeOp::Arithmetic(_)
        ));
    }

    #[test]
    fn test_connection_errors() {
        let (boolean, arithmetic) = circuits();

        let unknown = ".model c\n.gate MUX a=b\n.end\n";
        assert!(matches!(
            connect(unknown, &boolean, &arithmetic),
            Err(NetlistError::UnknownOperator { .. })
        ));

        let nested = ".model c\n.subckt inner a=b\n.end\n";
        assert!(matches!(
            connect(nested, &boolean, &arithmetic),
            Err(NetlistError::NestedConnection { .. })
        ));

        let narrow = ".model c\n.gate bool_top y[0]=w0 y[1]=w1\n.gate arith_top v=p\n.gate btoa o=p i0=w0 i1=w1\n.end\n";
        assert!(matches!(
            connect(narrow, &boolean, &arithmetic),
            Err(NetlistError::BridgeWidthMismatch { width: 2, .. })
        ));

        let dangling = ".model c\n.gate arith_top v=p\n.gate BtoA o=p i0=nowhere\n.end\n";
        assert!(matches!(
            connect(dangling, &boolean, &arithmetic),
            Err(NetlistError::UntranslatedWire { .. })
        ));

        let bad_pin = ".model c\n.gate arith_top nope=p\n.end\n";
        assert!(matches!(
            connect(bad_pin, &boolean, &arithmetic),
            Err(NetlistError::UntranslatedWire { .. })
        ));
    }

    #[test]
    fn test_domains_are_checked() {
        let (boolean, arithmetic) = circuits();
        let bool_flat = flatten(&boolean).unwrap();
        let arith_flat = flatten(&arithmetic).unwrap();
        assert!(matches!(
            compose(&arith_flat, &bool_flat, &ConnectionSpec::default()),
            Err(NetlistError::DomainMismatch { .. })
        ));
    }
}
