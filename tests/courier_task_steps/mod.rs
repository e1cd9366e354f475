//! Step definitions for courier task lifecycle scenarios.

mod given;
mod then;
