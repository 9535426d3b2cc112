use geo::Polygon;
use std::path::PathBuf;

// Slide image extension paired with each polygon file
pub const SLIDE_EXTENSION: &str = "svs";

// A polygon waiting to be written as an annotation. Legacy files carry no
// class, so imported shapes are unclassified; classified shapes reference
// the project's class vocabulary by index.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeRecord {
    Unclassified(Polygon<f64>),
    Classified { polygon: Polygon<f64>, class_id: usize },
}

impl ShapeRecord {
    pub fn polygon(&self) -> &Polygon<f64> {
        match self {
            ShapeRecord::Unclassified(polygon) => polygon,
            ShapeRecord::Classified { polygon, .. } => polygon,
        }
    }

    pub fn class_id(&self) -> Option<usize> {
        match self {
            ShapeRecord::Unclassified(_) => None,
            ShapeRecord::Classified { class_id, .. } => Some(*class_id),
        }
    }
}

// One sample folder: a slide image and the polygon file next to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePair {
    pub folder: PathBuf,
    pub image: PathBuf,
    pub polygons: PathBuf,
}

// Counters reported at the end of an import run
#[derive(Debug, Default, Clone)]
pub struct ImportStats {
    pub folders_scanned: usize,
    pub folders_paired: usize,
    pub skipped_missing_image: usize,
    pub skipped_missing_polygons: usize,
    pub images_added: usize,
    pub annotations_added: usize,
    pub degenerate_polygons: usize,
    pub skipped_unknown_class: usize,
}

impl ImportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        log::info!("=== Import Summary ===");
        log::info!("Folders scanned: {}", self.folders_scanned);
        log::info!("Folders paired: {}", self.folders_paired);
        log::info!("Images added: {}", self.images_added);
        log::info!("Annotations added: {}", self.annotations_added);

        let total_skipped = self.skipped_missing_image + self.skipped_missing_polygons;
        if total_skipped > 0 {
            log::warn!(
                "Skipped folders: {} (missing image: {}, missing polygon file: {})",
                total_skipped,
                self.skipped_missing_image,
                self.skipped_missing_polygons
            );
        }
        if self.degenerate_polygons > 0 {
            log::warn!(
                "Polygons with fewer than 3 distinct vertices: {}",
                self.degenerate_polygons
            );
        }
        if self.skipped_unknown_class > 0 {
            log::warn!(
                "Annotations skipped (unknown class id): {}",
                self.skipped_unknown_class
            );
        }
    }
}

// Counters reported at the end of an export run
#[derive(Debug, Default, Clone)]
pub struct ExportStats {
    pub images_exported: usize,
    pub polygons_written: usize,
    pub files: Vec<PathBuf>,
}

impl ExportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        log::info!("=== Export Summary ===");
        log::info!("Images exported: {}", self.images_exported);
        log::info!("Polygons written: {}", self.polygons_written);
    }
}
