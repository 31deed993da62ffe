//! Generation error taxonomy.
//!
//! Geometric impossibilities and quality-gate failures are fatal for one
//! build attempt: they unwind to the model's retry loop, which discards all
//! partial state and starts over on the same random stream. Soft kernel
//! degeneracies (a `cut` that misses, an empty shrink) are signalled by
//! sentinel return values instead and never reach this type.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The Bowyer-Watson boundary walk did not close into a single loop.
    #[error("triangulation boundary failed to close around an inserted point")]
    DegenerateTriangulation,

    /// The circumference walk over a patch set did not close into a loop.
    #[error("patch circumference walk failed to close")]
    DegenerateBoundary,

    /// A walled area offered no usable entrance vertices.
    #[error("bad walled area shape: no valid entrance vertices")]
    NoEntrances,

    /// The citadel patch failed the compactness quality gate.
    #[error("bad citadel shape")]
    BadCitadelShape,

    /// No route exists from a gate to the town center.
    #[error("unable to build a street")]
    StreetRouting,

    /// Every build attempt failed.
    #[error("town generation failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
