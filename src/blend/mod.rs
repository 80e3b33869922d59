//! Everything that turns a pad position (or a drawn path) into a pattern.

pub mod blender;
pub mod cache;
pub mod cells;
pub mod path;
pub mod weights;

pub use blender::{DEFAULT_THRESHOLD, average_latent, threshold_blend};
pub use cache::{Accepted, BuildPlan, PathFrame, PathPatternCache};
pub use cells::{Cell, CellGrid};
pub use path::{finalize_path, path_length, sample_by_arc_length};
pub use weights::{BlendWeights, weights};
