//! Protocol engines: enrollment, login verification, trusted devices.

pub mod devices;
pub mod enrollment;
pub mod verification;
