//! Result reporting for test runs.
//!
//! A [`core::dispatcher::Dispatcher`] broadcasts the five lifecycle events
//! of a run to its registered [`reporters::Reporter`]s. Each reporter
//! renders them as human text or JSON lines and writes through a shared
//! [`core::output::OutputChannel`].

pub mod core {
    pub mod color;
    pub mod config;
    pub mod dispatcher;
    pub mod error;
    pub mod event;
    pub mod output;
}

pub mod replay;
pub mod reporters;
