//! Identity types for the pipeline.
//!
//! Ids are `u32` newtypes that index straight into the coordinator's storage
//! vectors. Port ids pack the owning algorithm and the port index into one
//! word so they stay `Copy` and hashable.

use serde::Serialize;
use std::fmt;

/// Index into the coordinator's algorithm registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
pub struct AlgorithmId(pub u32);

impl AlgorithmId {
    pub const INVALID: AlgorithmId = AlgorithmId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "AlgorithmId(INVALID)")
        } else {
            write!(f, "AlgorithmId({})", self.0)
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const PORT_BITS: u32 = 12;
const PORT_MASK: u32 = (1 << PORT_BITS) - 1;

#[inline]
fn pack(algorithm: AlgorithmId, index: u16) -> u32 {
    debug_assert!(index < (1 << PORT_BITS) as u16);
    (algorithm.0 << PORT_BITS) | (index as u32 & PORT_MASK)
}

/// Output port of an algorithm. High 20 bits = algorithm index, low 12 bits
/// = port index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub u32);

impl PortId {
    pub fn new(algorithm: AlgorithmId, index: u16) -> Self {
        Self(pack(algorithm, index))
    }

    #[inline]
    pub fn algorithm(self) -> AlgorithmId {
        AlgorithmId(self.0 >> PORT_BITS)
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & PORT_MASK) as usize
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PortId(alg={}, out={})", self.algorithm().0, self.index())
    }
}

/// Input port of an algorithm, packed like [`PortId`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputPortId(pub u32);

impl InputPortId {
    pub fn new(algorithm: AlgorithmId, index: u16) -> Self {
        Self(pack(algorithm, index))
    }

    #[inline]
    pub fn algorithm(self) -> AlgorithmId {
        AlgorithmId(self.0 >> PORT_BITS)
    }

    #[inline]
    pub fn index(self) -> usize {
        (self.0 & PORT_MASK) as usize
    }
}

impl fmt::Debug for InputPortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputPortId(alg={}, in={})", self.algorithm().0, self.index())
    }
}

/// Index into the coordinator's connection table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    pub const INVALID: ConnectionId = ConnectionId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ConnectionId(INVALID)")
        } else {
            write!(f, "ConnectionId({})", self.0)
        }
    }
}
