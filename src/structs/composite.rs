use crate::error::NetlistResult;
use crate::structs::connection::Bridge;
use crate::structs::gates::Gate;
use crate::structs::wire::WireId;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// One step of a composite circuit.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum CompositeOp {
    /// Sizes of the arithmetic and boolean wire spaces.
    SizeHint { arithmetic: u64, boolean: u64 },
    /// A boolean input wire.
    Input(WireId),
    Boolean(Gate),
    Bridge(Bridge),
    Arithmetic(Gate),
    /// An arithmetic output, which must evaluate to zero.
    AssertZero(WireId),
}

/// A boolean circuit and an arithmetic circuit joined by bridges, as a sequence of operations.
///
/// The binary form is the bincode encoding of the operation sequence.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct CompositeCircuit {
    pub ops: Vec<CompositeOp>,
}

impl CompositeCircuit {
    pub fn write_into(&self, writer: &mut impl Write) -> NetlistResult<()> {
        bincode::serialize_into(writer, &self.ops)?;
        Ok(())
    }

    pub fn read_from(reader: impl Read) -> NetlistResult<CompositeCircuit> {
        let ops = bincode::deserialize_from(reader)?;
        Ok(CompositeCircuit { ops })
    }

    pub fn bridges(&self) -> impl Iterator<Item = &Bridge> {
        self.ops.iter().filter_map(|op| match op {
            CompositeOp::Bridge(bridge) => Some(bridge),
            _ => None,
        })
    }
}

#[test]
fn test_write_and_read() {
    let circuit = CompositeCircuit {
        ops: vec![
            CompositeOp::SizeHint {
                arithmetic: 2,
                boolean: 66,
            },
            CompositeOp::Input(2),
            CompositeOp::Bridge(Bridge {
                arithmetic: 0,
                boolean: 2..66,
            }),
            CompositeOp::AssertZero(1),
        ],
    };
    let mut buffer = vec![];
    circuit.write_into(&mut buffer).unwrap();
    let decoded = CompositeCircuit::read_from(&buffer[..]).unwrap();
    assert_eq!(decoded, circuit);
    assert_eq!(decoded.bridges().count(), 1);

    assert!(CompositeCircuit::read_from(&buffer[..3]).is_err());
}
