#![doc(html_root_url = "https://docs.rs/paie-dom/0.1.0")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Browser glue for the PaiePro payroll front-end.
//!
//! [`gate::PermissionGate`] loads the current user's permissions and answers lookups against them;
//! [`web::DomGate`] applies those answers to `data-permission` annotated markup.
//! [`spa::SpaManager`] swaps HTML fragments into the page and releases each page's charts, timers,
//! listeners and variables through a [`registry::PageResourceRegistry`] before the next one loads.
//!
//! Everything outside [`web`] is independent of the browser and runs on any target.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod api;
pub mod config;
mod error;
pub mod gate;
pub mod registry;
pub mod requirement;
pub mod snapshot;
pub mod spa;
pub mod ttl_cache;
pub mod web;

pub use error::{Error, Result};
