//! Client side of the tile streaming protocol.
//!
//! A [`FetchLoop`] pulls one image as a sequence of GETs until the server answers
//! with a sentinel record or an empty body. The [`InteractionController`] turns
//! user input into those episodes and never lets two run at once.

pub mod config;
pub mod controller;
pub mod fetch;
pub mod surface;
pub mod transport;

pub use config::{ClientConfig, ConfigError, StartupMode};
pub use controller::{EpisodeTicket, InteractionController, SessionStats};
pub use fetch::{Episode, EpisodeError, EpisodeOutcome, EpisodeState, FetchLoop};
pub use surface::{DisplaySurface, TileFragment};
pub use transport::{HttpTileSource, TileSource, TransportError};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
