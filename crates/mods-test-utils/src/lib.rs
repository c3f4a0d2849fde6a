//! Shared test utilities for the mod resolver workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`dir`]: [`TestModsDir`], a temporary mods directory with manifest writers
//! - [`manifest`]: [`ManifestBuilder`] producing `mod.toml` text
//! - [`meta`]: shorthands for building [`mods_meta::ModMetadata`] in memory

pub mod dir;
pub mod manifest;
pub mod meta;

pub use dir::TestModsDir;
pub use manifest::ManifestBuilder;
