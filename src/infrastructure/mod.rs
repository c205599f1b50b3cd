//! Adapters and cross-cutting infrastructure concerns, grouped the way the
//! domain groups its ports: one reliability envelope (`core`), one
//! reference exchange adapter (`exchange`), one reference chain adapter
//! (`chain`), and the pull-based metrics surface (`observability`).

pub mod chain;
pub mod core;
pub mod exchange;
pub mod observability;
