//! Code generation backends.
//!
//! The kernel never talks to a model directly. It hands a
//! [`GenerateRequest`] to a [`CodeGenerator`] and gets a `CodePatch` or a
//! [`GenerateError`] back.
//!
//! - [`HttpGenerator`]: JSON over HTTP to a configured endpoint
//! - [`ScriptedGenerator`]: canned replies for tests and demos
//! - [`Unconfigured`]: fails every request; the default without an endpoint

mod client;
mod http;
mod scripted;

pub use client::{CodeGenerator, GenerateError, GenerateRequest, GenerateResponse, Unconfigured};
pub use http::HttpGenerator;
pub use scripted::ScriptedGenerator;
