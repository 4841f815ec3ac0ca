/*!
 * Monitoring Module
 * Structured tracing for the termination sequence
 */

pub mod tracer;

pub use tracer::{generate_trace_id, init_tracing, ShutdownSpan};
