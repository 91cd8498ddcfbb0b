// Domain layer - replay data model, free of I/O
pub mod cursor;
pub mod identity;
pub mod playback;
pub mod plot;
pub mod resolution;
pub mod sample;
pub mod stats;
