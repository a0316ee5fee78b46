//! Hierarchical model graph for the Chronon DEVS simulation kernel.
//!
//! A simulation's structure is a tree of models: coupled models own
//! child models and the connections between their ports; atomic models
//! are the leaves that carry behavior. This crate stores the tree in an
//! arena addressed by [`ModelId`](chronon_core::ModelId), validates its
//! structural invariants, and resolves hierarchical event routing from
//! an output port down to the set of concrete atomic input ports.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod graph;
pub mod model;

pub use graph::ModelGraph;
pub use model::{Coupled, InputLink, InternalConnection, ModelKind, ModelNode, OutputLink};
