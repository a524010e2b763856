//! Transport module - TCP listener the worker accepts host connections on.

mod tcp;

pub use tcp::WorkerListener;
