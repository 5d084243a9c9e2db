//! Test suites for the server runtime.

mod host;
mod router;
mod support;
