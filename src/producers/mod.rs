/// Parser of BLIF netlists.
pub mod blif;

/// Parser of Yosys JSON netlists.
pub mod json;

/// Builder of composite circuits from a connection netlist.
pub mod compositor;

/// Example netlists.
pub mod examples;
