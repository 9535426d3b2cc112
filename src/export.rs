use log::{debug, info, warn};
use sanitize_filename::sanitize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExportArgs;
use crate::error::ConvertError;
use crate::geometry::open_ring;
use crate::itn::{write_itn_file, ITN_EXTENSION};
use crate::project::{ImageEntry, OpenMode, Project};
use crate::types::ExportStats;
use crate::utils::{create_progress_bar, file_stem_string, group_folder_name, recreate_directory};

/// Output file of an image: `{output_root}/{group}/{stem}.itn`
pub fn output_path(output_root: &Path, image_name: &str) -> PathBuf {
    let stem = sanitize(file_stem_string(Path::new(image_name)));
    output_root
        .join(sanitize(group_folder_name(image_name)))
        .join(format!("{}.{}", stem, ITN_EXTENSION))
}

/// Vertex lists of an image's annotations, ordered by annotation id.
/// Class labels have no place in the legacy format and are dropped.
pub fn image_polygons(image: &ImageEntry) -> Vec<Vec<(f64, f64)>> {
    let mut annotations: Vec<_> = image.hierarchy.annotations().iter().collect();
    annotations.sort_by_key(|annotation| annotation.id());
    annotations
        .into_iter()
        .map(|annotation| {
            if let Some(class) = annotation.path_class() {
                debug!(
                    "Dropping class '{}' of annotation {} on {}",
                    class,
                    annotation.id(),
                    image.image_name()
                );
            }
            open_ring(annotation.roi())
        })
        .collect()
}

/// Fail when recreating `output_root` would delete any part of the project:
/// the root must neither hold the project directory nor lie inside it.
pub fn ensure_output_outside_project(
    project_dir: &Path,
    output_root: &Path,
) -> Result<(), ConvertError> {
    // A missing output root cannot overlap an existing project.
    let Ok(output) = fs::canonicalize(output_root) else {
        return Ok(());
    };
    let project = fs::canonicalize(project_dir)?;
    if project.starts_with(&output) || output.starts_with(&project) {
        return Err(ConvertError::OutputOverlapsProject { output, project });
    }
    Ok(())
}

/// Write one `.itn` file per image under a freshly recreated `output_root`.
pub fn export_project(project: &Project, output_root: &Path) -> Result<ExportStats, ConvertError> {
    ensure_output_outside_project(project.path(), output_root)?;
    recreate_directory(output_root)?;

    let mut stats = ExportStats::new();
    let mut prepared: HashSet<PathBuf> = HashSet::from([output_root.to_path_buf()]);
    let mut written: HashSet<PathBuf> = HashSet::new();

    let pb = create_progress_bar(project.images().len() as u64, "Export");
    for image in project.images() {
        let path = output_path(output_root, image.image_name());
        if let Some(folder) = path.parent() {
            if prepared.insert(folder.to_path_buf()) {
                recreate_directory(folder)?;
            }
        }
        if !written.insert(path.clone()) {
            warn!(
                "{:?} was already written by another image named {}, overwriting",
                path,
                image.image_name()
            );
        }

        let polygons = image_polygons(image);
        write_itn_file(&path, &polygons)?;
        debug!("Wrote {} polygon(s) to {:?}", polygons.len(), path);

        stats.images_exported += 1;
        stats.polygons_written += polygons.len();
        stats.files.push(path);
        pb.inc(1);
    }
    pb.finish_with_message("Export complete");
    Ok(stats)
}

/// Run a full export of the project named in `args`.
pub fn run_export(args: &ExportArgs) -> Result<ExportStats, ConvertError> {
    let project = Project::open(&args.project, OpenMode::ReadOnly)?;
    info!("Opened project '{}'", project.name());
    info!("Project has {} image(s).", project.images().len());

    let stats = export_project(&project, &args.output_dir)?;
    project.close()?;
    Ok(stats)
}
