//! Keeps keyed chart elements in step with a live, remotely stored collection.
//!
//! A [`SyncController`](`sync::SyncController`) folds batches of [`ChangeEvent`](`collection::ChangeEvent`)s into an ordered [`Collection`](`collection::Collection`),
//! [`diff`](`diff::diff`)s the result against the keys rendered last time,
//! and dispatches enter, update and exit instructions to a [`RenderSink`](`sink::RenderSink`)
//! while a [`TransitionScheduler`](`transition::TransitionScheduler`) tweens each element from where it was to where it should be.
//!
//! Everything runs on one thread. Nothing here is `Send`.

#![doc(html_root_url = "https://docs.rs/chart-sync/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod collection;
pub mod config;
pub mod diff;
pub mod dom;
pub mod error;
pub mod interpolate;
pub mod record;
pub mod shape;
pub mod sink;
pub mod sync;
pub mod transition;

pub use crate::{
	collection::{ChangeEvent, Collection},
	config::SyncConfig,
	record::{Document, Keyed},
	sink::RenderSink,
	sync::SyncController,
};
