pub extern crate serde;

/// Implementation of the CLI.
pub mod cli;

/// Errors of the netlist pipeline.
pub mod error;

/// Data structures: wires, gates, modules, flat and composite circuits.
pub mod structs;

/// Tools to produce netlists and circuits: parsers, examples, and the composite builder.
pub mod producers;

/// Tools to consume netlists and circuits: linter, flattener, Bristol writer, evaluator.
pub mod consumers;

// Exports.
pub use consumers::{flattening::flatten, linter::Linter, source::Source};
pub use error::{NetlistError, NetlistResult};
pub use producers::blif::{parse_blif, ParseOptions};
pub use structs::{
    flat::FlatCircuit,
    gates::{Gate, GateOp},
    graph::ModuleGraph,
    module::Module,
    wire::{Domain, WireAllocator, WireId},
};

// Common definitions.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
