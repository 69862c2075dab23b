//! Physics Error Types
//!
//! Unified error type for the impulse2d engine. Construction-time APIs
//! (mesh registration, body creation) return `Result<T, PhysicsError>`
//! instead of raw booleans or panicking; the simulation step itself is
//! non-faulting and absorbs recoverable domain events.
//!
//! Author: Moroya Sakamoto

use core::fmt;

/// Unified error type for physics operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhysicsError {
    /// A polygon mesh failed validation at registration.
    InvalidMesh {
        /// Human-readable description of the problem
        reason: &'static str,
    },
    /// A body referenced a mesh id that is neither registered nor the
    /// circle sentinel.
    MeshNotFound {
        /// The unknown mesh id
        id: usize,
    },
    /// A body construction parameter was rejected (mass, moment of inertia).
    InvalidBodyParameter {
        /// Human-readable description of the problem
        reason: &'static str,
    },
    /// A capacity limit was exceeded (mesh table, grid cells).
    CapacityExceeded {
        /// What resource was exhausted
        resource: &'static str,
        /// The limit that was exceeded
        limit: usize,
    },
}

impl fmt::Display for PhysicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMesh { reason } => write!(f, "invalid mesh: {reason}"),
            Self::MeshNotFound { id } => write!(f, "mesh id {id} is not registered"),
            Self::InvalidBodyParameter { reason } => {
                write!(f, "invalid body parameter: {reason}")
            }
            Self::CapacityExceeded { resource, limit } => {
                write!(f, "{resource} capacity exceeded (limit={limit})")
            }
        }
    }
}

impl std::error::Error for PhysicsError {}

// ============================================================================
// Tests
// ============================================================================
