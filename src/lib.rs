//! Lazily populated, observable index of a directory tree.

#![allow(clippy::enum_variant_names)]

pub mod config;
pub mod ext;
pub mod filesystem;
pub mod index;
