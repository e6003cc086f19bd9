use crate::WireId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The operation of a gate: one of the closed boolean primitives,
/// or an opaque technology cell carried by name.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum GateOp {
    And,
    Xor,
    Inv,
    Buf,
    Cell(String),
}

use GateOp::*;

impl GateOp {
    /// Recognize an operator by name, case-insensitively.
    /// Yosys internal cells (`$_AND_`, ...) are accepted too.
    /// Anything else is kept as an opaque cell.
    pub fn parse(name: &str) -> GateOp {
        let bare = name.trim_start_matches("$_").trim_end_matches('_');
        match &bare.to_ascii_uppercase()[..] {
            "AND" => And,
            "XOR" => Xor,
            "INV" | "NOT" => Inv,
            "BUF" | "ALIAS" => Buf,
            _ => Cell(name.to_string()),
        }
    }

    /// Number of inputs of the primitive, if known.
    pub fn arity(&self) -> Option<usize> {
        match self {
            And | Xor => Some(2),
            Inv | Buf => Some(1),
            Cell(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            And => "AND",
            Xor => "XOR",
            Inv => "INV",
            Buf => "BUF",
            Cell(name) => name,
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A gate with ordered inputs and exactly one output.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Gate {
    pub op: GateOp,
    pub inputs: Vec<WireId>,
    pub output: WireId,
}

impl Gate {
    pub fn new(op: GateOp, inputs: Vec<WireId>, output: WireId) -> Gate {
        Gate { op, inputs, output }
    }

    pub fn and(left: WireId, right: WireId, output: WireId) -> Gate {
        Gate::new(And, vec![left, right], output)
    }

    pub fn xor(left: WireId, right: WireId, output: WireId) -> Gate {
        Gate::new(Xor, vec![left, right], output)
    }

    pub fn inv(input: WireId, output: WireId) -> Gate {
        Gate::new(Inv, vec![input], output)
    }

    pub fn buf(input: WireId, output: WireId) -> Gate {
        Gate::new(Buf, vec![input], output)
    }

    /// A copy of this gate with every wire passed through `rename`.
    pub fn renamed(&self, mut rename: impl FnMut(WireId) -> WireId) -> Gate {
        Gate {
            op: self.op.clone(),
            inputs: self.inputs.iter().map(|w| rename(*w)).collect(),
            output: rename(self.output),
        }
    }

    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.inputs.iter().copied().chain(std::iter::once(self.output))
    }
}

/// The Bristol line of a gate: input count, output count, inputs in reverse order, output, operator.
impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} 1", self.inputs.len())?;
        for input in self.inputs.iter().rev() {
            write!(f, " {}", input)?;
        }
        write!(f, " {} {}", self.output, self.op)
    }
}

#[test]
fn test_parse_operator() {
    assert_eq!(GateOp::parse("and"), And);
    assert_eq!(GateOp::parse("XOR"), Xor);
    assert_eq!(GateOp::parse("not"), Inv);
    assert_eq!(GateOp::parse("INV"), Inv);
    assert_eq!(GateOp::parse("alias"), Buf);
    assert_eq!(GateOp::parse("$_AND_"), And);
    assert_eq!(GateOp::parse("$_NOT_"), Inv);
    assert_eq!(GateOp::parse("NAND2X1"), Cell("NAND2X1".to_string()));
    assert_eq!(Cell("NAND2X1".to_string()).to_string(), "NAND2X1");
    assert_eq!(Cell("NAND2X1".to_string()).arity(), None);
}

#[test]
fn test_bristol_line() {
    assert_eq!(Gate::and(2, 3, 4).to_string(), "2 1 3 2 4 AND");
    assert_eq!(Gate::inv(5, 6).to_string(), "1 1 5 6 INV");
    let renamed = Gate::xor(2, 3, 4).renamed(|w| w + 10);
    assert_eq!(renamed, Gate::xor(12, 13, 14));
}
