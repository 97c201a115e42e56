//! scan-relay - run a command-line scanner as live, cancellable sessions.
//!
//! The [`scan`] module holds the session core: spawning the scanner,
//! pumping its stdout and stderr into a shared event log, tracking progress,
//! and turning a session into a self-terminating event stream. [`web`]
//! exposes that core over HTTP with server-sent events.

pub mod config;
pub mod display;
pub mod scan;
pub mod web;
