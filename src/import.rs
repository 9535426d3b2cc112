use log::{debug, info, warn};

use crate::config::{ClassVocabulary, ImportArgs};
use crate::error::{ConvertError, ProjectError};
use crate::geometry::POLYGON_GEOM_TYPE;
use crate::pairing::{collect_shapes, other_tissue_folders, regular_tissue_folders, SampleShapes};
use crate::project::{ImageType, OpenMode, PathClass, Project};
use crate::types::{ImportStats, ShapeRecord};
use crate::utils::create_progress_bar;

/// Replace the project's classes with the vocabulary, in order.
pub fn register_classes(
    project: &mut Project,
    vocabulary: &ClassVocabulary,
) -> Result<(), ProjectError> {
    let classes = vocabulary
        .classes()
        .iter()
        .map(|spec| PathClass::new(&spec.name, spec.color))
        .collect();
    project.set_path_classes(classes)?;

    info!("Registering classes in project '{}':", project.name());
    for class in project.path_classes() {
        info!("'{}'", class.name);
    }
    Ok(())
}

/// Register the vocabulary, then add every image and its polygons as
/// annotations. Shapes referencing an unknown class are skipped.
pub fn populate_project(
    project: &mut Project,
    shapes: &SampleShapes,
    vocabulary: &ClassVocabulary,
    image_type: ImageType,
    stats: &mut ImportStats,
) -> Result<(), ProjectError> {
    register_classes(project, vocabulary)?;
    let classes = project.path_classes().to_vec();

    let pb = create_progress_bar(shapes.len() as u64, "Images");
    for (image_path, image_shapes) in shapes {
        let entry = project.add_image(image_path, image_type, true)?;
        stats.images_added += 1;

        for shape in image_shapes {
            let path_class = match shape {
                ShapeRecord::Unclassified(_) => None,
                ShapeRecord::Classified { class_id, .. } => match classes.get(*class_id) {
                    Some(class) => Some(class),
                    None => {
                        warn!(
                            "Found classification with class id {}, ignoring",
                            class_id
                        );
                        stats.skipped_unknown_class += 1;
                        continue;
                    }
                },
            };
            let annotation = entry
                .hierarchy
                .add_annotation(shape.polygon().clone(), path_class);
            annotation.name = Some(POLYGON_GEOM_TYPE.to_string());
            stats.annotations_added += 1;
        }
        debug!(
            "Added {} annotation(s) to {}",
            entry.hierarchy.len(),
            entry.image_name()
        );
        pb.inc(1);
    }
    pb.finish_with_message("Images complete");
    Ok(())
}

/// Run a full import: discover sample folders, decode their polygons and
/// write them into the project.
pub fn run_import(args: &ImportArgs) -> Result<ImportStats, ConvertError> {
    if !args.src_dir.exists() {
        return Err(ConvertError::SourceMissing(args.src_dir.clone()));
    }

    let mut stats = ImportStats::new();
    let batches = [
        (
            "Regular tissue",
            regular_tissue_folders(&args.src_dir, &args.prefix)?,
        ),
        (
            "Other tissue",
            other_tissue_folders(&args.src_dir, &args.other_dir)?,
        ),
    ];
    let shapes = collect_shapes(&batches, &mut stats)?;

    let mut project = Project::open(&args.project, OpenMode::CreateOrAppend)?;
    info!("Opened project '{}' for import", project.name());
    populate_project(
        &mut project,
        &shapes,
        &args.vocabulary(),
        args.image_type,
        &mut stats,
    )?;
    project.close()?;

    Ok(stats)
}
