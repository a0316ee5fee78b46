//! Core types for the Chronon DEVS simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental vocabulary used throughout the Chronon workspace:
//! the virtual clock ([`Time`]), opaque payloads ([`Value`]), typed ids,
//! the event types exchanged between models, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod id;
pub mod time;
pub mod value;

pub use error::{ConfigError, DynamicsError, GraphError, ScheduleError, StepError};
pub use event::{Attributes, ExternalEvent, ExternalEventList, ObservationEvent};
pub use id::{ModelId, SimulatorId};
pub use time::Time;
pub use value::Value;
