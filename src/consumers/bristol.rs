use crate::error::{NetlistError, NetlistResult};
use crate::structs::flat::FlatCircuit;
use crate::structs::wire::{is_constant_wire, Domain, FALSE_WIRE, TRUE_WIRE};
use std::io::Write;

/// Write a flat boolean circuit in Bristol format.
///
/// The header gives the gate count and the wire count, followed by two legacy lines.
/// Each input is a `0 1 <wire> INPUT` line, each gate lists its inputs in reverse order
/// before its output, and each output is a `1 0 <wire> OUTPUT` line.
///
/// When the circuit reads a constant, wires 0 and 1 are declared as the first two inputs,
/// so the witness must start with `01`.
///
/// # Example
/// ```
/// use bristolify::consumers::bristol::to_bristol_string;
/// use bristolify::consumers::flattening::flatten;
/// use bristolify::producers::blif::{parse_blif, ParseOptions};
/// use bristolify::producers::examples::{example_and_blif, example_and_bristol};
/// use bristolify::structs::wire::Domain;
///
/// let graph = parse_blif(example_and_blif(), Domain::Boolean, &ParseOptions::default()).unwrap();
/// let flat = flatten(&graph).unwrap();
/// assert_eq!(to_bristol_string(&flat).unwrap(), example_and_bristol());
/// ```
pub fn write_bristol(circuit: &FlatCircuit, writer: &mut impl Write) -> NetlistResult<()> {
    if circuit.domain != Domain::Boolean {
        return Err(NetlistError::DomainMismatch {
            operation: "Bristol serialization".to_string(),
            expected: Domain::Boolean,
        });
    }

    writeln!(writer, "{} {}", circuit.gate_count(), circuit.wire_count())?;
    writeln!(writer, "0")?;
    writeln!(writer, "0")?;
    if reads_constants(circuit) {
        writeln!(writer, "0 1 {} INPUT", FALSE_WIRE)?;
        writeln!(writer, "0 1 {} INPUT", TRUE_WIRE)?;
    }
    for input in &circuit.inputs {
        writeln!(writer, "0 1 {} INPUT", input)?;
    }
    for gate in &circuit.gates {
        writeln!(writer, "{}", gate)?;
    }
    for output in &circuit.outputs {
        writeln!(writer, "1 0 {} OUTPUT", output)?;
    }
    Ok(())
}

/// Whether a gate or an output of the circuit reads one of the constant wires.
pub fn reads_constants(circuit: &FlatCircuit) -> bool {
    circuit
        .gate_inputs
        .iter()
        .chain(circuit.outputs.iter())
        .any(|w| is_constant_wire(Domain::Boolean, *w))
}

pub fn to_bristol_string(circuit: &FlatCircuit) -> NetlistResult<String> {
    let mut buffer = vec![];
    write_bristol(circuit, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
