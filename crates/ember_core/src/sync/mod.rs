//! # Frame Synchronization
//!
//! Buffer pairs whose roles flip once per frame.

mod ping_pong;

pub use ping_pong::PingPong;
