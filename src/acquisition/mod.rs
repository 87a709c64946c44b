//! Acquisition layer
//!
//! Everything between the analog pin and a voltage snapshot:
//! - analog peripheral abstraction and calibration ([`adc`])
//! - fixed-capacity circular raw-code buffer ([`buffer`])
//! - the sampling thread and its copy-out accessor ([`sampler`])
//! - simulated signal source for demos and tests ([`sim`])

pub mod adc;
pub mod buffer;
pub mod sampler;
pub mod sim;
