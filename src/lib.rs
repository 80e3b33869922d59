pub mod audio;
pub mod audio_api;
pub mod blend;
pub mod loader;
pub mod middle;
pub mod model;
pub mod pipeline;
pub mod sequencer;
pub mod shared;
pub mod tui;
