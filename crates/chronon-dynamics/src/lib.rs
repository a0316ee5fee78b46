//! Behavior contracts for the Chronon DEVS simulation kernel.
//!
//! Every atomic model carries one [`Dynamics`] implementation: the
//! init/output/time-advance/transition/observation automaton the
//! simulator wrapper drives. An [`Executive`] is a dynamics with
//! graph-mutation privileges — it queues [`StructuralChange`] requests
//! that the coordinator applies between steps. The
//! [`DynamicsFactory`] binds constructor names to boxed builders so
//! models (including those created mid-run) can be instantiated by
//! name.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dynamics;
pub mod executive;
pub mod factory;

pub use dynamics::Dynamics;
pub use executive::{Executive, StructuralChange, StructuralChanges};
pub use factory::DynamicsFactory;
