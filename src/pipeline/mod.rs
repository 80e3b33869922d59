pub mod export;
pub mod pattern;
pub mod persistence;
pub mod presets;
pub mod project;
