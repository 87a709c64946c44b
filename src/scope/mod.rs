//! Scope controller layer: scales, waveform storage, measurements, and the
//! core state machine that sits on top of the acquisition layer.

pub mod core;
pub mod events;
pub mod measure;
pub mod scales;
pub mod waveform;
