/// Wire IDs, numbering domains, and the allocator mapping wire names to IDs.
pub mod wire;

/// Gate is a closed set of boolean operations, plus opaque technology cells.
pub mod gates;

/// A Module is one model of a netlist, possibly instantiating other modules.
pub mod module;

/// ModuleGraph stores the modules of a netlist and resolves instance directions.
pub mod graph;

/// A FlatCircuit is a module with all instances inlined.
pub mod flat;

/// Bridges and translation tables between a boolean and an arithmetic circuit.
pub mod connection;

/// CompositeCircuit joins a boolean and an arithmetic circuit.
pub mod composite;
