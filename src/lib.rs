//! Legacy `.itn` polygon annotations <-> slide annotation project converter
//!
//! This library imports polygon annotations stored in `.itn` files next to
//! their slide images into an annotation project, and exports the
//! annotations of a project back into `.itn` files.

pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod import;
pub mod itn;
pub mod pairing;
pub mod project;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{ClassSpec, ClassVocabulary, ExportArgs, ImportArgs};
pub use error::{CodecError, ConvertError, PairingError, ProjectError};
pub use export::{export_project, run_export};
pub use import::{populate_project, register_classes, run_import};
pub use itn::{decode, encode, read_itn_file, write_itn_file, PolygonMap};
pub use pairing::{pair_folder, FileMatch, PairOutcome};
pub use project::{Annotation, ImageEntry, ImageType, OpenMode, PathClass, Project};
pub use types::{ExportStats, ImportStats, SamplePair, ShapeRecord};
