use crate::error::{NetlistError, NetlistResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wires are identified by a numerical ID, unique within one numbering domain.
pub type WireId = u64;

/// Name and ID of the constant-0 wire of the boolean domain.
pub const FALSE_NAME: &str = "$false";
pub const FALSE_WIRE: WireId = 0;
/// Name and ID of the constant-1 wire of the boolean domain.
pub const TRUE_NAME: &str = "$true";
pub const TRUE_WIRE: WireId = 1;

/// A numbering domain. Boolean and arithmetic circuits are numbered independently.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum Domain {
    Boolean,
    Arithmetic,
}

impl Domain {
    /// How many IDs are reserved for constants at the start of the domain.
    pub fn reserved(self) -> WireId {
        match self {
            Domain::Boolean => 2,
            Domain::Arithmetic => 0,
        }
    }
}

/// WireAllocator maps wire names to IDs within one domain.
///
/// The same name always resolves to the same ID until `reset` is called.
/// In the boolean domain, `$false` and `$true` are pre-allocated to 0 and 1.
///
/// # Example
/// ```
/// use bristolify::structs::wire::{Domain, WireAllocator};
///
/// let mut alloc = WireAllocator::new(Domain::Boolean);
/// assert_eq!(alloc.id_for("a").unwrap(), 2);
/// assert_eq!(alloc.id_for("b").unwrap(), 3);
/// assert_eq!(alloc.id_for("a").unwrap(), 2);
/// assert_eq!(alloc.id_for("$true").unwrap(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct WireAllocator {
    domain: Domain,
    ids: HashMap<String, WireId>,
    names: Vec<String>,
}

impl WireAllocator {
    pub fn new(domain: Domain) -> WireAllocator {
        let mut alloc = WireAllocator {
            domain,
            ids: HashMap::new(),
            names: vec![],
        };
        alloc.reset();
        alloc
    }

    /// Forget every name and restart the numbering.
    pub fn reset(&mut self) {
        self.ids.clear();
        self.names.clear();
        if self.domain == Domain::Boolean {
            for name in &[FALSE_NAME, TRUE_NAME] {
                self.ids.insert(name.to_string(), self.names.len() as WireId);
                self.names.push(name.to_string());
            }
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Return the ID of `name`, allocating the next free ID on first sight.
    pub fn id_for(&mut self, name: &str) -> NetlistResult<WireId> {
        if let Some(id) = self.ids.get(name) {
            return Ok(*id);
        }
        if self.domain == Domain::Arithmetic && is_constant_name(name) {
            return Err(NetlistError::UnsupportedConstant {
                name: name.to_string(),
            });
        }
        let id = self.names.len() as WireId;
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        Ok(id)
    }

    /// Return the ID of `name` without allocating.
    pub fn lookup(&self, name: &str) -> Option<WireId> {
        self.ids.get(name).copied()
    }

    pub fn name_of(&self, id: WireId) -> Option<&str> {
        self.names.get(id as usize).map(|s| s.as_str())
    }

    /// A printable name for diagnostics, even for IDs that were never named.
    pub fn describe(&self, id: WireId) -> String {
        match self.name_of(id) {
            Some(name) => name.to_string(),
            None => format!("wire_{}", id),
        }
    }

    /// The first ID that has not been handed out.
    pub fn next_id(&self) -> WireId {
        self.names.len() as WireId
    }

    /// Number of IDs handed out, constants included.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.len() as WireId == self.domain.reserved()
    }

    pub fn is_constant(&self, id: WireId) -> bool {
        is_constant_wire(self.domain, id)
    }
}

pub fn is_constant_name(name: &str) -> bool {
    name == FALSE_NAME || name == TRUE_NAME
}

pub fn is_constant_wire(domain: Domain, id: WireId) -> bool {
    id < domain.reserved()
}

#[test]
fn test_boolean_allocation() {
    let mut alloc = WireAllocator::new(Domain::Boolean);
    assert!(alloc.is_empty());
    assert_eq!(alloc.id_for(FALSE_NAME).unwrap(), FALSE_WIRE);
    assert_eq!(alloc.id_for("x").unwrap(), 2);
    assert_eq!(alloc.id_for("y").unwrap(), 3);
    assert_eq!(alloc.id_for("x").unwrap(), 2);
    assert_eq!(alloc.name_of(3), Some("y"));
    assert_eq!(alloc.describe(40), "wire_40");
    assert_eq!(alloc.next_id(), 4);
    assert!(alloc.is_constant(TRUE_WIRE));
    assert!(!alloc.is_constant(2));

    alloc.reset();
    assert_eq!(alloc.id_for("y").unwrap(), 2);
}

#[test]
fn test_arithmetic_allocation() {
    let mut alloc = WireAllocator::new(Domain::Arithmetic);
    assert_eq!(alloc.id_for("x").unwrap(), 0);
    assert_eq!(alloc.id_for("y").unwrap(), 1);
    assert!(!alloc.is_constant(0));
    match alloc.id_for(TRUE_NAME) {
        Err(NetlistError::UnsupportedConstant { name }) => assert_eq!(name, TRUE_NAME),
        other => panic!("expected UnsupportedConstant, got {:?}", other),
    }
    assert_eq!(alloc.next_id(), 2);
}
