//! Discovery of (slide image, polygon file) pairs in a source tree
//!
//! Two layouts are scanned: regular tissue folders named `{prefix}*`
//! directly under the source directory, and other tissue folders nested
//! one level below `{source}/{other_dir}/`. Each folder must hold exactly
//! one `.itn` file and one `.svs` slide.

use glob::{glob, Pattern};
use log::{error, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::PairingError;
use crate::geometry::{is_valid_polygon, polygon_from_vertices};
use crate::itn::{read_itn_file, ITN_EXTENSION};
use crate::types::{ImportStats, SamplePair, ShapeRecord, SLIDE_EXTENSION};
use crate::utils::create_progress_bar;

/// Image path -> polygons to add to that image.
pub type SampleShapes = BTreeMap<PathBuf, Vec<ShapeRecord>>;

/// Result of looking for a file by extension in one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileMatch {
    None,
    One(PathBuf),
    Many(Vec<PathBuf>),
}

/// Why a folder produced no pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingImage,
    MissingPolygons,
}

/// Outcome of pairing one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Paired(SamplePair),
    Skipped(SkipReason),
}

impl PairOutcome {
    pub fn pair(self) -> Option<SamplePair> {
        match self {
            PairOutcome::Paired(pair) => Some(pair),
            PairOutcome::Skipped(_) => None,
        }
    }
}

/// Sorted glob matches of `pattern` that satisfy `keep`.
fn glob_sorted(pattern: &str, keep: fn(&Path) -> bool) -> Result<Vec<PathBuf>, PairingError> {
    let mut paths = Vec::new();
    for entry in glob(pattern)? {
        let path = entry?;
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn escaped(path: &Path) -> String {
    Pattern::escape(&path.to_string_lossy())
}

/// Find the files with `extension` directly inside `folder`.
pub fn find_by_extension(folder: &Path, extension: &str) -> Result<FileMatch, PairingError> {
    let pattern = format!("{}/*.{}", escaped(folder), Pattern::escape(extension));
    let mut files = glob_sorted(&pattern, Path::is_file)?;
    Ok(match files.len() {
        0 => FileMatch::None,
        1 => FileMatch::One(files.remove(0)),
        _ => FileMatch::Many(files),
    })
}

fn require_single(
    folder: &Path,
    extension: &str,
    found: FileMatch,
) -> Result<Option<PathBuf>, PairingError> {
    match found {
        FileMatch::None => Ok(None),
        FileMatch::One(path) => Ok(Some(path)),
        FileMatch::Many(files) => Err(PairingError::Ambiguous {
            folder: folder.to_path_buf(),
            extension: extension.to_string(),
            count: files.len(),
            files,
        }),
    }
}

/// Pair the polygon file and slide image of one sample folder.
pub fn pair_folder(folder: &Path) -> Result<PairOutcome, PairingError> {
    let polygons = require_single(
        folder,
        ITN_EXTENSION,
        find_by_extension(folder, ITN_EXTENSION)?,
    )?;
    let image = require_single(
        folder,
        SLIDE_EXTENSION,
        find_by_extension(folder, SLIDE_EXTENSION)?,
    )?;

    match (polygons, image) {
        (None, _) => Ok(PairOutcome::Skipped(SkipReason::MissingPolygons)),
        (_, None) => Ok(PairOutcome::Skipped(SkipReason::MissingImage)),
        (Some(polygons), Some(image)) => Ok(PairOutcome::Paired(SamplePair {
            folder: folder.to_path_buf(),
            image,
            polygons,
        })),
    }
}

/// Regular tissue folders: `{src_dir}/{prefix}*`.
pub fn regular_tissue_folders(src_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, PairingError> {
    let pattern = format!("{}/{}*", escaped(src_dir), Pattern::escape(prefix));
    glob_sorted(&pattern, Path::is_dir)
}

/// Other tissue folders: `{src_dir}/{other_dir}/*`. Empty when the
/// directory is absent.
pub fn other_tissue_folders(
    src_dir: &Path,
    other_dir: &str,
) -> Result<Vec<PathBuf>, PairingError> {
    let base = src_dir.join(other_dir);
    if !base.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/*", escaped(&base));
    glob_sorted(&pattern, Path::is_dir)
}

/// Pair every folder, decode its polygon file and accumulate the polygons
/// under the slide image path.
///
/// Folders missing a file are skipped. Ambiguous folders are all reported
/// and then fail the whole collection; decoding errors fail immediately.
pub fn collect_shapes(
    batches: &[(&str, Vec<PathBuf>)],
    stats: &mut ImportStats,
) -> Result<SampleShapes, PairingError> {
    let mut shapes = SampleShapes::new();
    let mut ambiguous = Vec::new();

    for (label, folders) in batches {
        let pb = create_progress_bar(folders.len() as u64, label);
        for folder in folders {
            stats.folders_scanned += 1;
            match pair_folder(folder) {
                Ok(PairOutcome::Paired(pair)) => {
                    stats.folders_paired += 1;
                    add_pair_shapes(&pair, &mut shapes, stats)?;
                }
                Ok(PairOutcome::Skipped(SkipReason::MissingPolygons)) => {
                    warn!("No .{} file in {:?}, skipping", ITN_EXTENSION, folder);
                    stats.skipped_missing_polygons += 1;
                }
                Ok(PairOutcome::Skipped(SkipReason::MissingImage)) => {
                    warn!("No .{} file in {:?}, skipping", SLIDE_EXTENSION, folder);
                    stats.skipped_missing_image += 1;
                }
                Err(e @ PairingError::Ambiguous { .. }) => {
                    error!("{}", e);
                    ambiguous.push(e);
                }
                Err(e) => return Err(e),
            }
            pb.inc(1);
        }
        pb.finish_with_message(format!("{} complete", label));
    }

    if ambiguous.is_empty() {
        Ok(shapes)
    } else {
        Err(PairingError::AmbiguousFolders(ambiguous))
    }
}

fn add_pair_shapes(
    pair: &SamplePair,
    shapes: &mut SampleShapes,
    stats: &mut ImportStats,
) -> Result<(), PairingError> {
    let polygons = read_itn_file(&pair.polygons)?;
    if polygons.is_empty() {
        warn!("No polygons in {:?}", pair.polygons);
        return Ok(());
    }
    let image_shapes = shapes.entry(pair.image.clone()).or_default();
    for (index, vertices) in polygons {
        let polygon = polygon_from_vertices(&vertices);
        if !is_valid_polygon(&polygon) {
            warn!(
                "Polygon {} in {:?} has fewer than 3 distinct vertices",
                index, pair.polygons
            );
            stats.degenerate_polygons += 1;
        }
        image_shapes.push(ShapeRecord::Unclassified(polygon));
    }
    Ok(())
}
