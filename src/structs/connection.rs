use crate::error::{NetlistError, NetlistResult};
use crate::structs::wire::WireId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Number of boolean wires packed into one arithmetic wire.
pub const BRIDGE_WIDTH: usize = 64;

/// A bit-packing conversion: the boolean wires `boolean` (low bit first) form the value
/// of the arithmetic wire `arithmetic`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Bridge {
    pub arithmetic: WireId,
    pub boolean: Range<WireId>,
}

impl Bridge {
    /// Build a bridge from the boolean wires feeding it, which must be exactly
    /// `BRIDGE_WIDTH` contiguous IDs in any order.
    pub fn new(arithmetic: WireId, boolean_wires: &[WireId]) -> NetlistResult<Bridge> {
        let low = boolean_wires.iter().copied().min().unwrap_or(0);
        let high = boolean_wires.iter().copied().max().map_or(0, |w| w + 1);

        let mut sorted = boolean_wires.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if boolean_wires.len() != BRIDGE_WIDTH
            || sorted.len() != BRIDGE_WIDTH
            || (high - low) as usize != BRIDGE_WIDTH
        {
            return Err(NetlistError::BridgeWidthMismatch {
                low,
                width: boolean_wires.len(),
            });
        }
        Ok(Bridge {
            arithmetic,
            boolean: low..high,
        })
    }
}

/// The wiring between a boolean circuit and an arithmetic circuit.
///
/// Connection wires are named in the connection netlist; each translation table maps
/// those names to the wire IDs of one side.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectionSpec {
    pub boolean_translation: HashMap<String, WireId>,
    pub arithmetic_translation: HashMap<String, WireId>,
    pub bridges: Vec<Bridge>,
}

impl ConnectionSpec {
    pub fn boolean_wire(&self, name: &str) -> NetlistResult<WireId> {
        translate(&self.boolean_translation, name, "boolean")
    }

    pub fn arithmetic_wire(&self, name: &str) -> NetlistResult<WireId> {
        translate(&self.arithmetic_translation, name, "arithmetic")
    }
}

fn translate(table: &HashMap<String, WireId>, name: &str, side: &str) -> NetlistResult<WireId> {
    table.get(name).copied().ok_or_else(|| NetlistError::UntranslatedWire {
        wire: name.to_string(),
        side: side.to_string(),
    })
}

#[test]
fn test_bridge_width() {
    let wires: Vec<WireId> = (100..164).rev().collect();
    let bridge = Bridge::new(7, &wires).unwrap();
    assert_eq!(bridge.boolean, 100..164);
    assert_eq!(bridge.arithmetic, 7);

    assert!(matches!(
        Bridge::new(7, &wires[1..]),
        Err(NetlistError::BridgeWidthMismatch { low: 100, width: 63 })
    ));

    let mut gapped = wires.clone();
    gapped[0] = 200;
    assert!(matches!(
        Bridge::new(7, &gapped),
        Err(NetlistError::BridgeWidthMismatch { .. })
    ));

    let mut repeated = wires;
    repeated[0] = 101;
    assert!(Bridge::new(7, &repeated).is_err());
}
