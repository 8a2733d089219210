//! Per-collection domain operations
//!
//! Each module owns one persisted collection and builds strictly on the
//! document store contract; nothing here touches the storage backend
//! directly. The store does not validate referential fields across
//! collections, so each operation checks only what it needs.

pub mod escalas;
pub mod ministerios;
pub mod musicas;
pub mod usuarios;
