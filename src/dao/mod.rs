//! Persistence layer: entities, the player-store abstraction, and its
//! backends.

pub mod models;
pub mod player_store;
pub mod storage;
