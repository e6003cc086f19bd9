//! Example netlists, used by the `example` tool and by tests.

use crate::structs::connection::BRIDGE_WIDTH;

/// A single AND gate: `y = a & b`.
pub fn example_and_blif() -> &'static str {
    "\
# Single AND gate.
.model top
.inputs a b
.outputs y
.gate AND A=a B=b Y=y
.end
"
}

/// A top module instantiating the same NAND-like subcircuit twice.
/// The subcircuit is declared after its caller.
pub fn example_hierarchy_blif() -> &'static str {
    "\
.model top
.inputs a b c
.outputs y z
.subckt and_inv x=a w=b o=y
.subckt and_inv x=b w=c o=z
.end

.model and_inv
.inputs x w
.outputs o
.gate AND A=x B=w Y=t
.gate INV A=t Y=o
.end
"
}

/// A module whose second output is never driven.
pub fn example_undriven_blif() -> &'static str {
    "\
.model top
.inputs a b
.outputs y q
.gate XOR A=a B=b Y=y
.end
"
}

/// The modules of `example_hierarchy_blif` as a Yosys JSON netlist,
/// with a third instance tied to constant 1.
pub fn example_hierarchy_json() -> &'static str {
    r#"{
  "creator": "Yosys",
  "modules": {
    "and_inv": {
      "ports": {
        "x": { "direction": "input", "bits": [ 2 ] },
        "w": { "direction": "input", "bits": [ 3 ] },
        "o": { "direction": "output", "bits": [ 4 ] }
      },
      "cells": {
        "$and": {
          "type": "$_AND_",
          "port_directions": { "A": "input", "B": "input", "Y": "output" },
          "connections": { "A": [ 2 ], "B": [ 3 ], "Y": [ 5 ] }
        },
        "$not": {
          "type": "$_NOT_",
          "port_directions": { "A": "input", "Y": "output" },
          "connections": { "A": [ 5 ], "Y": [ 4 ] }
        }
      }
    },
    "top": {
      "ports": {
        "a": { "direction": "input", "bits": [ 2 ] },
        "b": { "direction": "input", "bits": [ 3 ] },
        "c": { "direction": "input", "bits": [ 4 ] },
        "y": { "direction": "output", "bits": [ 5 ] },
        "z": { "direction": "output", "bits": [ 6 ] }
      },
      "cells": {
        "u0": {
          "type": "and_inv",
          "port_directions": { "x": "input", "w": "input", "o": "output" },
          "connections": { "x": [ 2 ], "w": [ 3 ], "o": [ 5 ] }
        },
        "u1": {
          "type": "and_inv",
          "port_directions": { "x": "input", "w": "input", "o": "output" },
          "connections": { "x": [ 3 ], "w": [ 4 ], "o": [ 6 ] }
        },
        "u2": {
          "type": "and_inv",
          "port_directions": { "x": "input", "w": "input", "o": "output" },
          "connections": { "x": [ 2 ], "w": [ "1" ], "o": [ 7 ] }
        }
      }
    }
  }
}
"#
}

/// A Yosys JSON netlist whose leaf ties its output port to constant 0.
pub fn example_constant_port_json() -> &'static str {
    r#"{
  "modules": {
    "tie_low": {
      "ports": {
        "i": { "direction": "input", "bits": [ 2 ] },
        "o": { "direction": "output", "bits": [ "0" ] }
      },
      "cells": {}
    },
    "top": {
      "ports": {
        "a": { "direction": "input", "bits": [ 2 ] },
        "y": { "direction": "output", "bits": [ 3 ] }
      },
      "cells": {
        "u0": {
          "type": "tie_low",
          "port_directions": { "i": "input", "o": "output" },
          "connections": { "i": [ 2 ], "o": [ 3 ] }
        }
      }
    }
  }
}
"#
}

/// Scenario of the evaluator: two inputs, one AND, one output.
pub fn example_and_bristol() -> &'static str {
    "\
1 5
0
0
0 1 2 INPUT
0 1 3 INPUT
2 1 3 2 4 AND
1 0 4 OUTPUT
"
}

/// A boolean circuit inverting a 64-bit word.
pub fn example_boolean_word_blif() -> String {
    let bits = |name: &str| -> String {
        (0..BRIDGE_WIDTH)
            .map(|i| format!("{}[{}]", name, i))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut text = format!(".model bool_top\n.inputs {}\n.outputs {}\n", bits("a"), bits("y"));
    for i in 0..BRIDGE_WIDTH {
        text += &format!(".gate INV A=a[{}] Y=y[{}]\n", i, i);
    }
    text += ".end\n";
    text
}

/// An arithmetic circuit squaring its input.
pub fn example_arithmetic_blif() -> &'static str {
    "\
.model arith_top
.inputs v
.outputs z
.gate MUL A=v B=v Y=z
.end
"
}

/// A connection netlist packing the output word of `example_boolean_word_blif`
/// into the input of `example_arithmetic_blif`.
pub fn example_connection_blif() -> String {
    let mut bool_pins = String::new();
    let mut bridge_pins = String::new();
    for i in 0..BRIDGE_WIDTH {
        bool_pins += &format!(" a[{i}]=in{i} y[{i}]=word{i}", i = i);
        bridge_pins += &format!(" i{i}=word{i}", i = i);
    }
    format!(
        ".model connect\n.gate bool_top{}\n.gate arith_top v=packed z=result\n.gate BtoA o=packed{}\n.end\n",
        bool_pins, bridge_pins
    )
}
