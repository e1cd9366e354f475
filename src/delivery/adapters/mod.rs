//! Adapter implementations for delivery ports.

pub mod memory;
pub mod postgres;
pub mod rules;
