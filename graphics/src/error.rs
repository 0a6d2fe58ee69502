//! Compiler error types.

use std::fmt;

/// Errors raised directly from resource database operations, surfaced to
/// the caller immediately rather than deferred to [`compile`](crate::graph::RenderGraph::compile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// A resource with this name already exists for its kind.
    DuplicateName(String),
    /// No resource with this name is registered for its kind.
    UnknownName(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "duplicate resource name: {name}"),
            Self::UnknownName(name) => write!(f, "unknown resource name: {name}"),
        }
    }
}

impl std::error::Error for DatabaseError {}

/// Errors raised while compiling a render graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A command referenced a resource that was never created.
    UnknownResource(String),
    /// A command sequence recorded a setup command more than once before
    /// the next dispatch/copy boundary.
    InvalidCommandSequence(String),
    /// The resource dependency graph contains a cycle.
    CyclicDependency,
    /// A subresource index ran out of room in its bounded node pool.
    CapacityExceeded(String),
    /// A command variant is not supported by this compiler.
    UnsupportedCommand(String),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownResource(name) => write!(f, "unknown resource: {name}"),
            Self::InvalidCommandSequence(msg) => write!(f, "invalid command sequence: {msg}"),
            Self::CyclicDependency => write!(f, "resource dependency graph contains a cycle"),
            Self::CapacityExceeded(what) => write!(f, "capacity exceeded: {what}"),
            Self::UnsupportedCommand(what) => write!(f, "unsupported command: {what}"),
        }
    }
}

impl std::error::Error for CompileError {}
