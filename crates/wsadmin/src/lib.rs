//! # wsadmin
//!
//! WebSphere Application Server binding for the `declarative` engine.
//!
//! This crate provides:
//! - Reading cell configuration documents (`resources.xml`, `server.xml`, ...)
//!   with blob suppression and namespace-free queries
//! - The Jython [`Dialect`](declarative::Dialect) used by `wsadmin -lang jython`
//! - A [`ScriptRunner`](declarative::ScriptRunner) spawning `wsadmin.sh`
//!   once per payload, with an optional timeout
//! - The output signature table used to classify results
//!
//! ## Example
//!
//! ```no_run
//! use declarative::{ApplyContext, Reconciler};
//! use wsadmin::{Jython, ProfileLayout, WsadminRunner};
//!
//! let layout = ProfileLayout::new("/opt/IBM/WebSphere/AppServer/profiles", "PROFILE_DMGR_01");
//! let runner = WsadminRunner::new(&layout).expect("wsadmin not installed");
//! let classifier = wsadmin::signatures::default_classifier();
//! let reconciler = Reconciler::new(&runner, &Jython, &classifier);
//!
//! let root = layout.config_root();
//! let ctx = ApplyContext::new(&root);
//! ```

pub mod document;
pub mod error;
pub mod jython;
pub mod layout;
pub mod runner;
pub mod signatures;

pub use document::{ConfigDocument, DEFAULT_IGNORE_SUFFIXES, Element, Step};
pub use error::{Error, Result};
pub use jython::Jython;
pub use layout::{ProfileLayout, files};
pub use runner::WsadminRunner;
