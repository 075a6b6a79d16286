#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

//! # glstate: bound-state tracking for OpenGL (ES)
//!
//! This crate is the OpenGL backend of a 2D rendering engine. It sits between a renderer issuing
//! semantic requests (bind this texture, use this blend mode, read back that framebuffer) and the
//! GL driver, and keeps the number of state changes reaching the driver to a minimum.
//!
//! ## Structure of the crate
//!
//! - [`context`] contains the [`GraphicsContext`](context::GraphicsContext), which caches the
//!   currently bound objects and manages the lifecycle of GPU resources, shaders and uniforms.
//! - [`driver`] contains the [`Driver`](driver::Driver) trait the context talks to, and its
//!   implementations.
//! - [`input`] contains an aggregation object for platform adapters delivering input events
//!   one by one.
//!
//! ## Threading
//!
//! A GL context is bound to one thread, and so is everything in [`context`]: none of its types
//! are `Send` or `Sync`.
//!
//! ### Logging
//!
//! glstate makes use of [`tracing`] for its internal logging.
//!
//! For release builds it is recommended to limit the log level during compile time.
//! This can be done by adding a dependency to [`tracing`] and enabling the corresponding features.
//! For example to enable `trace` messages for debug builds, but limit release builds to `debug` add
//! the following in your binary crate `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! tracing = { version = "0.1", features = ["max_level_trace", "release_max_level_debug"] }
//! ```

pub mod context;
pub mod driver;
pub mod input;

#[cfg(any(test, feature = "renderer_test"))]
pub mod testing;
