//! # Louvor Common Library
//!
//! Shared code for all Louvor modules including:
//! - Document store over a key-value storage backend
//! - Collection models (usuarios, ministerios, escalas, musicas)
//! - Domain operations per collection
//! - Event types (LouvorEvent enum) and the broadcast bus
//! - Configuration loading and root folder resolution

pub mod collections;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod store;

pub use error::{Error, Result};
pub use store::{DocumentStore, Record};
