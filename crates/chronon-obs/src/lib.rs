//! Observation for the Chronon DEVS simulation kernel.
//!
//! A [`View`] is a sampling subscription: it watches `(simulator,
//! port)` pairs and forwards sampled values to its [`Stream`] sink.
//! Event views sample whenever a watched model transitions; timed
//! views sample on a fixed timestep; finish views sample once when the
//! simulation ends. The kernel does not care what the sink does with
//! the values — [`MemoryStream`] keeps them in memory, which is what
//! tests and embedded analysis want.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod stream;
pub mod view;

pub use stream::{MemoryHandle, MemoryStream, Record, Stream};
pub use view::{Observable, View, ViewKind};
