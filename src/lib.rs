//! Procedural Town Generator
//!
//! Grows a medieval town from a single seed: an expanding spiral of points is
//! triangulated incrementally (Bowyer-Watson), the Voronoi cells become city
//! patches, a curtain wall with gates is carved around the inner districts,
//! streets are routed from the gates to the center over a vertex graph, and
//! each district ward subdivides itself into building footprints.
//!
//! This implementation uses:
//! - Arena-based data structures (no Rc<RefCell<T>>)
//! - Shared vertex identities across patches, walls and streets
//! - One deterministic random stream for the whole pipeline

pub mod config;
pub mod cutter;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod model;
pub mod polygon;
pub mod random;
pub mod svg;
pub mod topology;
pub mod voronoi;
pub mod wall;
pub mod wards;

pub use config::{Feature, TownConfig};
pub use error::GenerationError;
pub use model::{Model, Patch, PatchId};
pub use svg::{Palette, SvgRenderer};

/// Generate a town from the given configuration.
pub fn generate_town(config: &TownConfig) -> Result<Model, GenerationError> {
    Model::new(config)
}
