use crate::error::{NetlistError, NetlistResult};
use crate::structs::gates::GateOp;
use crate::structs::wire::{is_constant_wire, Domain, FALSE_WIRE, TRUE_WIRE};
use std::collections::{HashMap, VecDeque};

type Wire = u64;
type Repr = bool;

/// The Evaluator runs a Bristol circuit on a witness of bits and records the outputs.
///
/// Every `INPUT` line consumes the next witness bit, in file order.
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    values: HashMap<Wire, Repr>,
    witness_queue: VecDeque<Repr>,
    outputs: Vec<(Wire, Repr)>,

    evaluated_gates: usize,
    overwrites: usize,
    found_error: Option<String>,
    constants_bound: bool,
}

impl Evaluator {
    /// An evaluator where wires 0 and 1 hold the constants false and true.
    /// `INPUT` lines for these wires then consume no witness bit.
    pub fn with_constants() -> Evaluator {
        let mut evaluator = Evaluator::default();
        evaluator.values.insert(FALSE_WIRE, false);
        evaluator.values.insert(TRUE_WIRE, true);
        evaluator.constants_bound = true;
        evaluator
    }

    /// Queue witness bits, given as ASCII `0` and `1`. Whitespace is ignored.
    pub fn ingest_witness(&mut self, witness: &str) -> NetlistResult<()> {
        for (i, line) in witness.lines().enumerate() {
            for c in line.chars().filter(|c| !c.is_whitespace()) {
                match c {
                    '0' => self.witness_queue.push_back(false),
                    '1' => self.witness_queue.push_back(true),
                    _ => return Err(NetlistError::parse(i + 1, format!("bad witness bit {:?}", c))),
                }
            }
        }
        Ok(())
    }

    /// Evaluate a whole circuit. The first error stops the evaluation and is kept as a violation.
    pub fn ingest_circuit(&mut self, bristol: &str) {
        if self.found_error.is_some() {
            return;
        }
        if let Err(err) = self.ingest_bristol(bristol) {
            self.found_error = Some(err.to_string());
        }
    }

    pub fn ingest_bristol(&mut self, bristol: &str) -> NetlistResult<()> {
        let mut lines = bristol
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        match lines.next() {
            Some((number, header)) => {
                let counts: Vec<_> = header.split_whitespace().map(|t| t.parse::<u64>()).collect();
                if counts.len() != 2 || counts.iter().any(|c| c.is_err()) {
                    return Err(NetlistError::parse(number, "expected '<gates> <wires>'"));
                }
            }
            None => return Err(NetlistError::parse(0, "empty circuit")),
        }
        // Two legacy lines, whatever they hold.
        lines.next();
        lines.next();

        for (number, line) in lines {
            self.ingest_line(number, line)?;
        }

        if !self.witness_queue.is_empty() {
            tracing::warn!("{} witness bits were not consumed", self.witness_queue.len());
        }
        Ok(())
    }

    fn ingest_line(&mut self, number: usize, line: &str) -> NetlistResult<()> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let bad_line = || NetlistError::parse(number, format!("malformed gate line '{}'", line));

        if tokens.len() < 3 {
            return Err(bad_line());
        }
        let n_inputs: usize = tokens[0].parse().map_err(|_| bad_line())?;
        let n_outputs: usize = tokens[1].parse().map_err(|_| bad_line())?;
        if tokens.len() != 3 + n_inputs + n_outputs {
            return Err(bad_line());
        }
        let wires = tokens[2..2 + n_inputs + n_outputs]
            .iter()
            .map(|t| t.parse::<Wire>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| bad_line())?;
        let (inputs, outputs) = wires.split_at(n_inputs);
        let op = tokens[tokens.len() - 1];

        match op {
            "INPUT" => {
                let out = *outputs.first().ok_or_else(bad_line)?;
                if self.constants_bound && is_constant_wire(Domain::Boolean, out) {
                    return Ok(());
                }
                let bit = self
                    .witness_queue
                    .pop_front()
                    .ok_or(NetlistError::WitnessExhausted { wire: out })?;
                self.set(out, bit);
            }

            "OUTPUT" => {
                let inp = *inputs.first().ok_or_else(bad_line)?;
                let value = self.get(inp)?;
                self.outputs.push((inp, value));
            }

            _ => {
                let gate_op = GateOp::parse(op);
                if let GateOp::Cell(name) = gate_op {
                    return Err(NetlistError::UnknownOperator { op: name });
                }
                if Some(n_inputs) != gate_op.arity() || n_outputs != 1 {
                    return Err(bad_line());
                }
                let value = match gate_op {
                    GateOp::And => self.get(inputs[0])? & self.get(inputs[1])?,
                    GateOp::Xor => self.get(inputs[0])? ^ self.get(inputs[1])?,
                    GateOp::Inv => !self.get(inputs[0])?,
                    _ => self.get(inputs[0])?,
                };
                self.set(outputs[0], value);
                self.evaluated_gates += 1;
            }
        }
        Ok(())
    }

    fn set(&mut self, id: Wire, value: Repr) {
        if self.values.insert(id, value).is_some() {
            self.overwrites += 1;
            tracing::warn!("Overwriting wire {}", id);
        }
    }

    pub fn get(&self, id: Wire) -> NetlistResult<Repr> {
        self.values
            .get(&id)
            .copied()
            .ok_or(NetlistError::UnsetWire { wire: id })
    }

    /// Output wires and their values, in file order.
    pub fn outputs(&self) -> &[(Wire, Repr)] {
        &self.outputs
    }

    pub fn evaluated_gates(&self) -> usize {
        self.evaluated_gates
    }

    pub fn overwrites(&self) -> usize {
        self.overwrites
    }

    pub fn get_violations(self) -> Vec<String> {
        let mut violations = vec![];
        if let Some(err) = self.found_error {
            violations.push(err);
        }
        violations
    }
}

/// Evaluate `bristol` on `witness` and return the outputs.
pub fn evaluate(bristol: &str, witness: &str, constants: bool) -> NetlistResult<Vec<(Wire, Repr)>> {
    let mut evaluator = if constants {
        Evaluator::with_constants()
    } else {
        Evaluator::default()
    };
    evaluator.ingest_witness(witness)?;
    evaluator.ingest_bristol(bristol)?;
    Ok(evaluator.outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::bristol::to_bristol_string;
    use crate::consumers::flattening::flatten;
    use crate::producers::blif::{parse_blif, ParseOptions};
    use crate::producers::examples::*;
    use crate::structs::wire::Domain;

    #[test]
    fn test_single_and() {
        assert_eq!(evaluate(example_and_bristol(), "11", false).unwrap(), vec![(4, true)]);
        assert_eq!(evaluate(example_and_bristol(), "10", false).unwrap(), vec![(4, false)]);
        assert_eq!(evaluate(example_and_bristol(), " 0\n1 ", false).unwrap(), vec![(4, false)]);
    }

    #[test]
    fn test_flattened_hierarchy() {
        let graph = parse_blif(example_hierarchy_blif(), Domain::Boolean, &ParseOptions::default()).unwrap();
        let mut flat = flatten(&graph).unwrap();
        flat.sort_topologically().unwrap();
        let bristol = to_bristol_string(&flat).unwrap();

        // y = !(a & b), z = !(b & c)
        for (witness, y, z) in &[("000", true, true), ("110", false, true), ("011", true, false), ("111", false, false)] {
            let outputs = evaluate(&bristol, witness, true).unwrap();
            assert_eq!(outputs, vec![(5, *y), (6, *z)]);
        }
    }

    #[test]
    fn test_constants() {
        let bristol = "1 4\n0\n0\n0 1 2 INPUT\n2 1 2 1 3 XOR\n1 0 3 OUTPUT\n";
        assert_eq!(evaluate(bristol, "1", true).unwrap(), vec![(3, false)]);
        assert!(matches!(
            evaluate(bristol, "1", false),
            Err(NetlistError::UnsetWire { wire: 1 })
        ));

        // Declared constants come first in the witness, unless they are bound.
        let declared = "1 4\n0\n0\n0 1 0 INPUT\n0 1 1 INPUT\n0 1 2 INPUT\n2 1 2 1 3 XOR\n1 0 3 OUTPUT\n";
        assert_eq!(evaluate(declared, "011", false).unwrap(), vec![(3, false)]);
        assert_eq!(evaluate(declared, "010", false).unwrap(), vec![(3, true)]);

        let mut evaluator = Evaluator::with_constants();
        evaluator.ingest_witness("0").unwrap();
        evaluator.ingest_circuit(declared);
        assert_eq!(evaluator.outputs(), &[(3, true)]);
        assert_eq!(evaluator.overwrites(), 0);
        assert!(evaluator.get_violations().is_empty());
    }

    #[test]
    fn test_failures() {
        assert!(matches!(
            evaluate(example_and_bristol(), "1", false),
            Err(NetlistError::WitnessExhausted { wire: 3 })
        ));
        assert!(matches!(
            evaluate(example_and_bristol(), "1x", false),
            Err(NetlistError::ParseError { line: 1, .. })
        ));

        let unknown = "1 4\n0\n0\n0 1 2 INPUT\n1 1 2 3 MAJ\n";
        assert!(matches!(
            evaluate(unknown, "1", false),
            Err(NetlistError::UnknownOperator { .. })
        ));

        let truncated = "1 4\n0\n0\n0 1 2 INPUT\n2 1 2 3 AND\n";
        assert!(matches!(
            evaluate(truncated, "1", false),
            Err(NetlistError::ParseError { line: 5, .. })
        ));
    }

    #[test]
    fn test_overwrite_is_not_fatal() {
        let bristol = "2 3\n0\n0\n0 1 2 INPUT\n1 1 2 2 BUF\n1 1 2 2 INV\n1 0 2 OUTPUT\n";
        let mut evaluator = Evaluator::default();
        evaluator.ingest_witness("1").unwrap();
        evaluator.ingest_circuit(bristol);
        assert_eq!(evaluator.overwrites(), 2);
        assert_eq!(evaluator.evaluated_gates(), 2);
        assert_eq!(evaluator.outputs(), &[(2, false)]);
        assert!(evaluator.get_violations().is_empty());
    }
}
