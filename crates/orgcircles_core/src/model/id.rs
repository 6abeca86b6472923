//! Identifier generation for new entities.
//!
//! # Invariants
//! - Generated ids are never nil.
//! - The default generator draws 122 random bits per id (UUID v4).

use std::fmt::Debug;
use uuid::Uuid;

/// Stable identifier of a circle, role or template-instance node.
pub type NodeId = Uuid;
/// Stable identifier of a member.
pub type MemberId = Uuid;
/// Stable identifier of a role template.
pub type TemplateId = Uuid;

/// Source of fresh entity identifiers.
pub trait IdGenerator: Debug {
    /// Returns an id that has not been handed out before by this generator.
    fn next_id(&mut self) -> Uuid;
}

/// Random UUID v4 generator used by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic counter-backed generator.
///
/// Useful for hosts that need reproducible ids (fixtures, golden layouts).
/// Ids start at `Uuid::from_u128(1)` and increase by one.
#[derive(Debug, Clone)]
pub struct SequentialIdGenerator {
    next: u128,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Starts the counter at `first`; zero is bumped to one so ids are never nil.
    pub fn starting_at(first: u128) -> Self {
        Self {
            next: first.max(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&mut self) -> Uuid {
        let id = Uuid::from_u128(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}
