//! # EMBER
//!
//! The facade crate, tying the pieces together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          EMBER                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌────────────────┐   ┌────────────────┐   ┌──────────────┐  │
//! │  │  ember_core    │──>│ ember_effects  │   │ ember_       │  │
//! │  │                │   │                │   │ procedural   │  │
//! │  │  • Math / POD  │   │  • CPU ring    │   │              │  │
//! │  │  • Seeds       │   │  • Stream-out  │   │  • Bezier    │  │
//! │  │  • Ring cursors│   │  • Emitters    │   │  • Foliage   │  │
//! │  └───────┬────────┘   └───────┬────────┘   └──────┬───────┘  │
//! │          │                    │                   │          │
//! │          └──────────> scenario (this crate) <─────┘          │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `scenario`: scenario files and the fixed-step runner behind `ember-sim`

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod scenario;

// Re-export the crates
pub use ember_core as core;
pub use ember_effects as effects;
pub use ember_procedural as procedural;

pub use scenario::{
    EmitterConfig, EmitterSummary, FoliageSummary, ParticleVariant, Scenario, ScenarioConfig, ScenarioSummary,
    StreamOutSummary, TerrainConfig, TerrainKind,
};
