use crate::structs::wire::{Domain, WireId};
use thiserror::Error;

/// Errors raised while parsing, flattening, composing or evaluating a netlist.
#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("No module named '{callee}' available (referenced by '{parent}')")]
    UnresolvedSubcircuit { callee: String, parent: String },

    #[error("Wire '{wire}' of module '{callee}' is not an I/O port (bound by '{module}')")]
    UnmatchedPairing {
        module: String,
        callee: String,
        wire: String,
    },

    #[error("Module '{module}' uses wire '{wire}', but nothing drives it")]
    UndrivenWire { module: String, wire: String },

    #[error("Wire '{wire}' of module '{module}' is declared both as input and as output")]
    AliasConflict { module: String, wire: String },

    #[error("Module '{module}' drives wire '{wire}' more than once")]
    MultiplyDriven { module: String, wire: String },

    #[error("Port of '{callee}' is tied to a constant, but '{module}' binds it to '{wire}'")]
    ConstantPort {
        module: String,
        callee: String,
        wire: String,
    },

    #[error("Constant wire '{name}' has no meaning in the arithmetic domain")]
    UnsupportedConstant { name: String },

    #[error("A bridge must pack exactly 64 contiguous boolean wires, got {width} wires starting at {low}")]
    BridgeWidthMismatch { low: WireId, width: usize },

    #[error("Unknown operator '{op}'")]
    UnknownOperator { op: String },

    #[error("Wire '{wire}' of the connection netlist is not bound to the '{side}' circuit")]
    UntranslatedWire { wire: String, side: String },

    #[error("Subcircuit '{callee}' cannot be instantiated inside a connection netlist")]
    NestedConnection { callee: String },

    #[error("Module '{module}' instantiates itself (through {path})")]
    RecursiveInstance { module: String, path: String },

    #[error("The circuit contains a combinational loop through wire {wire}")]
    CombinationalLoop { wire: WireId },

    #[error("Module '{module}' failed the lint with {errors} errors and {warnings} warnings")]
    LintFailed {
        module: String,
        errors: usize,
        warnings: usize,
        /// The first finding.
        #[source]
        first: Box<NetlistError>,
    },

    #[error("{operation} expects a {expected:?} circuit")]
    DomainMismatch { operation: String, expected: Domain },

    #[error("Wire {wire} is read before being set")]
    UnsetWire { wire: WireId },

    #[error("The witness ran out of bits at input wire {wire}")]
    WitnessExhausted { wire: WireId },

    #[error("Composite encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NetlistError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        NetlistError::ParseError {
            line,
            message: message.into(),
        }
    }
}

pub type NetlistResult<T> = std::result::Result<T, NetlistError>;
