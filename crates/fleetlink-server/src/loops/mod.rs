//! Background loops.

pub mod telemetry_poll_loop;

pub use telemetry_poll_loop::run_telemetry_poll_loop;
