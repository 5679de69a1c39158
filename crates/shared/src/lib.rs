//! Wire vocabulary for the tile streaming protocol: view parameters, navigation
//! intents, response classification and the sentinel record codec.

pub mod domain;
pub mod error;
pub mod protocol;
