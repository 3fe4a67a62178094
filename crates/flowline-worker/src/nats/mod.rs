//! NATS event intake.

mod events;

pub use events::{EventIntake, EventMessage};
