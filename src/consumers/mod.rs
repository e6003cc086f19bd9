/// A Source finds and loads netlists, e.g. from files.
pub mod source;

/// The Linter checks that every wire of a netlist is driven.
pub mod linter;

/// Inlining of subcircuit instances.
pub mod flattening;

/// Writer of the Bristol circuit format.
pub mod bristol;

/// The Evaluator runs a Bristol circuit on a witness.
pub mod evaluator;

/// Stats aggregates statistics about a circuit.
pub mod stats;
