//! Error types for codec, discovery, project and conversion operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding or reading a legacy `.itn` polygon file.
#[derive(Error, Debug)]
pub enum CodecError {
    /// I/O or syntax error from the INI reader
    #[error("INI error: {0}")]
    Ini(#[from] ini::Error),

    /// I/O error while writing a document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document has no `[Polygon]` section
    #[error("Missing [{section}] section")]
    MissingSection {
        /// Name of the expected section
        section: String,
    },

    /// A vertex has only one of its two coordinates
    #[error("Polygon {polygon} vertex {vertex} has no '{missing}' coordinate")]
    UnpairedCoordinate {
        /// Polygon index embedded in the key
        polygon: usize,
        /// Vertex index embedded in the key
        vertex: usize,
        /// Axis that is absent ("x" or "y")
        missing: char,
    },

    /// A coordinate value is not a decimal number
    #[error("Invalid coordinate value '{value}' for key '{key}'")]
    InvalidCoordinate {
        /// Key of the offending entry
        key: String,
        /// Raw value found in the document
        value: String,
    },

    /// The same coordinate key appears more than once
    #[error("Duplicate coordinate key '{key}'")]
    DuplicateCoordinate {
        /// Normalized (lowercase) key
        key: String,
    },

    /// Wraps another codec error with the file it came from
    #[error("{path:?}: {source}")]
    InFile {
        /// File that failed to decode
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Box<CodecError>,
    },
}

impl CodecError {
    /// Attach a file path to this error.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

/// Errors raised while pairing slide images with polygon files.
#[derive(Error, Debug)]
pub enum PairingError {
    /// Failure reading a directory listing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid glob pattern built from the source directory
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Failure while walking a glob result
    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// More than one candidate file for a single required slot
    #[error("Ambiguous match in {folder:?}: {count} '*.{extension}' files ({files:?})")]
    Ambiguous {
        /// Folder that was scanned
        folder: PathBuf,
        /// Extension searched for
        extension: String,
        /// Number of files found
        count: usize,
        /// The matching files
        files: Vec<PathBuf>,
    },

    /// Several folders were ambiguous; the run is aborted
    #[error("{} folder(s) have ambiguous image or polygon files", .0.len())]
    AmbiguousFolders(Vec<PairingError>),

    /// Polygon file could not be decoded
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised by the annotation project store.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Project directory does not exist and the mode forbids creating it
    #[error("Project not found: {path:?}")]
    NotFound {
        /// Project directory
        path: PathBuf,
    },

    /// Project already exists and the mode requires a new one
    #[error("Project already exists: {path:?}")]
    AlreadyExists {
        /// Project directory
        path: PathBuf,
    },

    /// Mutation attempted on a project opened read-only
    #[error("Project {name} is opened read-only")]
    ReadOnly {
        /// Project name
        name: String,
    },

    /// Image file to register does not exist
    #[error("Image not found: {path:?}")]
    ImageNotFound {
        /// Path that was given
        path: PathBuf,
    },

    /// Image already registered and duplicates were not allowed
    #[error("Image already in project: {path:?}")]
    DuplicateImage {
        /// Resolved image path
        path: PathBuf,
    },

    /// Stored project data is inconsistent
    #[error("Corrupt project data: {message}")]
    Corrupt {
        /// Description of the problem
        message: String,
    },
}

impl ProjectError {
    /// Create a corrupt-data error with a message.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Top-level errors of an import or export run.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The source directory given to the importer does not exist
    #[error("Source directory {0:?} does not exist")]
    SourceMissing(PathBuf),

    /// Discovery failed
    #[error(transparent)]
    Pairing(#[from] PairingError),

    /// Project store failed
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Polygon file could not be read or written
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Export output root overlaps the project directory
    #[error("Output directory {output:?} overlaps project {project:?}")]
    OutputOverlapsProject {
        /// Output root given to the exporter
        output: PathBuf,
        /// Project directory
        project: PathBuf,
    },

    /// I/O error while preparing the output tree
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
