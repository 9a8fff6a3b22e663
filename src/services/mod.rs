//! Business logic bridging the HTTP routes and the game engine.

pub mod documentation;
pub mod health_service;
pub mod intent_service;
pub mod player_service;
pub mod sse_events;
pub mod sse_service;
