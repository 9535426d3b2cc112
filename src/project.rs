//! On-disk annotation project store
//!
//! A project is a directory holding the registered class vocabulary, the
//! registered slide images, and one annotation hierarchy per image:
//!
//! ```text
//! {project}/project.qpproj
//! {project}/classifiers/classes.json
//! {project}/data/{entryID}/annotations.json
//! ```
//!
//! Annotation geometries are stored as GeoJSON polygons with a closed ring.

use chrono::Utc;
use clap::ValueEnum;
use geo::{LineString, Polygon};
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ProjectError;
use crate::geometry::boundary;

pub const PROJECT_FILE: &str = "project.qpproj";
pub const CLASSES_FILE: &str = "classifiers/classes.json";
pub const DATA_DIR: &str = "data";
pub const ANNOTATIONS_FILE: &str = "annotations.json";

const PROJECT_VERSION: &str = "0.1.0";

/// How a project is opened.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OpenMode {
    /// Existing project, no mutation allowed
    ReadOnly,
    /// Existing project, mutations allowed
    ReadWrite,
    /// Open an existing project or create a new one
    CreateOrAppend,
    /// Create a new project; fail if one exists
    CreateNew,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::ReadOnly)
    }
}

/// Acquisition type of a slide image.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, ValueEnum)]
pub enum ImageType {
    #[serde(rename = "BRIGHTFIELD_H_E")]
    #[value(name = "brightfield-h-e")]
    BrightfieldHE,
    #[serde(rename = "BRIGHTFIELD_H_DAB")]
    #[value(name = "brightfield-h-dab")]
    BrightfieldHDab,
    #[serde(rename = "BRIGHTFIELD_OTHER")]
    #[value(name = "brightfield-other")]
    BrightfieldOther,
    #[serde(rename = "FLUORESCENCE")]
    #[value(name = "fluorescence")]
    Fluorescence,
    #[serde(rename = "OTHER")]
    #[value(name = "other")]
    Other,
    #[serde(rename = "UNSET")]
    #[value(name = "unset")]
    Unset,
}

/// A registered annotation class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathClass {
    pub name: String,
    /// Packed Java ARGB color
    pub color: i32,
}

impl PathClass {
    pub fn new(name: &str, color: i32) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }

    /// Color as `[r, g, b, a]`
    pub fn rgba(&self) -> [u8; 4] {
        let [a, r, g, b] = self.color.to_be_bytes();
        [r, g, b, a]
    }
}

/// A polygon annotation on one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: u64,
    roi: Polygon<f64>,
    path_class: Option<String>,
    pub name: Option<String>,
}

impl Annotation {
    /// Identifier assigned by the hierarchy, stable across saves
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn roi(&self) -> &Polygon<f64> {
        &self.roi
    }

    pub fn path_class(&self) -> Option<&str> {
        self.path_class.as_deref()
    }
}

/// The annotations of one image.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    annotations: Vec<Annotation>,
    next_id: u64,
}

impl Hierarchy {
    /// Add a polygon annotation and return it for further edits.
    pub fn add_annotation(
        &mut self,
        roi: Polygon<f64>,
        path_class: Option<&PathClass>,
    ) -> &mut Annotation {
        let id = self.next_id;
        self.next_id += 1;
        self.annotations.push(Annotation {
            id,
            roi,
            path_class: path_class.map(|class| class.name.clone()),
            name: None,
        });
        let last = self.annotations.len() - 1;
        &mut self.annotations[last]
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// A slide image registered with the project.
#[derive(Debug, Clone)]
pub struct ImageEntry {
    entry_id: u32,
    image_name: String,
    uri: PathBuf,
    image_type: ImageType,
    pub hierarchy: Hierarchy,
}

impl ImageEntry {
    pub fn entry_id(&self) -> u32 {
        self.entry_id
    }

    /// File name of the slide image
    pub fn image_name(&self) -> &str {
        &self.image_name
    }

    /// Absolute path of the slide image
    pub fn uri(&self) -> &Path {
        &self.uri
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    version: String,
    create_timestamp: i64,
    modify_timestamp: i64,
    #[serde(rename = "lastID")]
    last_id: u32,
    images: Vec<ImageRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageRecord {
    #[serde(rename = "entryID")]
    entry_id: u32,
    image_name: String,
    uri: PathBuf,
    image_type: ImageType,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassesFile {
    path_classes: Vec<PathClass>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HierarchyFile {
    next_id: u64,
    annotations: Vec<AnnotationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationRecord {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_class: Option<String>,
    roi: GeoJsonPolygon,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoJsonPolygon {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<[f64; 2]>>,
}

impl From<&Polygon<f64>> for GeoJsonPolygon {
    fn from(polygon: &Polygon<f64>) -> Self {
        let mut rings = vec![boundary(polygon).into_iter().map(|(x, y)| [x, y]).collect()];
        for interior in polygon.interiors() {
            rings.push(interior.coords().map(|c| [c.x, c.y]).collect());
        }
        Self {
            kind: "Polygon".to_string(),
            coordinates: rings,
        }
    }
}

impl TryFrom<GeoJsonPolygon> for Polygon<f64> {
    type Error = ProjectError;

    fn try_from(value: GeoJsonPolygon) -> Result<Self, Self::Error> {
        if value.kind != "Polygon" {
            return Err(ProjectError::corrupt(format!(
                "unsupported geometry type '{}'",
                value.kind
            )));
        }
        let mut rings = value.coordinates.into_iter().map(|ring| {
            LineString::from(ring.into_iter().map(|[x, y]| (x, y)).collect::<Vec<_>>())
        });
        let exterior = rings
            .next()
            .ok_or_else(|| ProjectError::corrupt("polygon without exterior ring"))?;
        Ok(Polygon::new(exterior, rings.collect()))
    }
}

/// An opened annotation project.
///
/// Pending changes are written by [`Project::save`] or [`Project::close`];
/// a writable project dropped without closing is saved on drop.
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
    mode: OpenMode,
    version: String,
    create_timestamp: i64,
    last_id: u32,
    classes: Vec<PathClass>,
    images: Vec<ImageEntry>,
    dirty: bool,
    closed: bool,
}

impl Project {
    /// Open the project stored in `path` with the given mode.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, ProjectError> {
        let root = path.as_ref().to_path_buf();
        let exists = root.join(PROJECT_FILE).is_file();

        match (mode, exists) {
            (OpenMode::ReadOnly | OpenMode::ReadWrite, false) => {
                Err(ProjectError::NotFound { path: root })
            }
            (OpenMode::CreateNew, true) => Err(ProjectError::AlreadyExists { path: root }),
            (_, true) => Self::load(root, mode),
            (_, false) => Self::create(root, mode),
        }
    }

    fn create(root: PathBuf, mode: OpenMode) -> Result<Self, ProjectError> {
        if root.is_dir() && fs::read_dir(&root)?.next().is_some() {
            return Err(ProjectError::corrupt(format!(
                "{:?} is not empty and holds no project",
                root
            )));
        }
        fs::create_dir_all(root.join(DATA_DIR))?;

        let mut project = Self {
            root,
            mode,
            version: PROJECT_VERSION.to_string(),
            create_timestamp: Utc::now().timestamp_millis(),
            last_id: 0,
            classes: Vec::new(),
            images: Vec::new(),
            dirty: true,
            closed: false,
        };
        project.save()?;
        debug!("Created project at {:?}", project.root);
        Ok(project)
    }

    fn load(root: PathBuf, mode: OpenMode) -> Result<Self, ProjectError> {
        let file: ProjectFile = read_json(&root.join(PROJECT_FILE))?;
        let classes_path = root.join(CLASSES_FILE);
        let classes: ClassesFile = if classes_path.is_file() {
            read_json(&classes_path)?
        } else {
            ClassesFile::default()
        };

        let mut images = Vec::with_capacity(file.images.len());
        for record in file.images {
            let hierarchy = load_hierarchy(&hierarchy_path(&root, record.entry_id))?;
            images.push(ImageEntry {
                entry_id: record.entry_id,
                image_name: record.image_name,
                uri: record.uri,
                image_type: record.image_type,
                hierarchy,
            });
        }

        let last_id = images
            .iter()
            .map(|image| image.entry_id)
            .max()
            .unwrap_or(0)
            .max(file.last_id);

        debug!("Loaded project at {:?} ({} images)", root, images.len());
        Ok(Self {
            root,
            mode,
            version: file.version,
            create_timestamp: file.create_timestamp,
            last_id,
            classes: classes.path_classes,
            images,
            dirty: false,
            closed: false,
        })
    }

    /// Project name: the name of its directory
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path_classes(&self) -> &[PathClass] {
        &self.classes
    }

    /// Replace every registered class with `classes`, keeping their order.
    pub fn set_path_classes(&mut self, classes: Vec<PathClass>) -> Result<(), ProjectError> {
        self.ensure_writable()?;
        self.classes = classes;
        self.dirty = true;
        Ok(())
    }

    pub fn images(&self) -> &[ImageEntry] {
        &self.images
    }

    /// Mutable access to a registered image.
    pub fn image_mut(&mut self, index: usize) -> Result<Option<&mut ImageEntry>, ProjectError> {
        self.ensure_writable()?;
        self.dirty = true;
        Ok(self.images.get_mut(index))
    }

    /// Register a slide image. The path must exist and is stored absolute.
    pub fn add_image(
        &mut self,
        path: impl AsRef<Path>,
        image_type: ImageType,
        allow_duplicates: bool,
    ) -> Result<&mut ImageEntry, ProjectError> {
        self.ensure_writable()?;
        let path = path.as_ref();
        let uri = fs::canonicalize(path).map_err(|_| ProjectError::ImageNotFound {
            path: path.to_path_buf(),
        })?;
        if !allow_duplicates && self.images.iter().any(|image| image.uri == uri) {
            return Err(ProjectError::DuplicateImage { path: uri });
        }

        self.last_id += 1;
        let image_name = uri
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.images.push(ImageEntry {
            entry_id: self.last_id,
            image_name,
            uri,
            image_type,
            hierarchy: Hierarchy::default(),
        });
        self.dirty = true;

        let last = self.images.len() - 1;
        Ok(&mut self.images[last])
    }

    /// Write the project files if anything changed.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        self.ensure_writable()?;
        if !self.dirty {
            return Ok(());
        }

        for image in &self.images {
            let path = hierarchy_path(&self.root, image.entry_id);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            write_json(&path, &hierarchy_file(&image.hierarchy))?;
        }

        let classes_path = self.root.join(CLASSES_FILE);
        if let Some(parent) = classes_path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_json(
            &classes_path,
            &ClassesFile {
                path_classes: self.classes.clone(),
            },
        )?;

        let file = ProjectFile {
            version: self.version.clone(),
            create_timestamp: self.create_timestamp,
            modify_timestamp: Utc::now().timestamp_millis(),
            last_id: self.last_id,
            images: self
                .images
                .iter()
                .map(|image| ImageRecord {
                    entry_id: image.entry_id,
                    image_name: image.image_name.clone(),
                    uri: image.uri.clone(),
                    image_type: image.image_type,
                })
                .collect(),
        };
        write_json(&self.root.join(PROJECT_FILE), &file)?;

        self.dirty = false;
        Ok(())
    }

    /// Save pending changes (writable projects) and release the project.
    pub fn close(mut self) -> Result<(), ProjectError> {
        self.closed = true;
        if self.mode.is_writable() {
            self.save()?;
        }
        info!("Closed project '{}'", self.name());
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), ProjectError> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(ProjectError::ReadOnly { name: self.name() })
        }
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        if self.closed || !self.mode.is_writable() || !self.dirty {
            return;
        }
        if let Err(e) = self.save() {
            error!("Failed to save project {:?}: {}", self.root, e);
        }
    }
}

fn hierarchy_path(root: &Path, entry_id: u32) -> PathBuf {
    root.join(DATA_DIR)
        .join(entry_id.to_string())
        .join(ANNOTATIONS_FILE)
}

fn load_hierarchy(path: &Path) -> Result<Hierarchy, ProjectError> {
    if !path.is_file() {
        return Ok(Hierarchy::default());
    }
    let file: HierarchyFile = read_json(path)?;
    let mut annotations = Vec::with_capacity(file.annotations.len());
    for record in file.annotations {
        annotations.push(Annotation {
            id: record.id,
            roi: Polygon::try_from(record.roi)?,
            path_class: record.path_class,
            name: record.name,
        });
    }
    let next_id = annotations
        .iter()
        .map(|annotation| annotation.id + 1)
        .max()
        .unwrap_or(0)
        .max(file.next_id);
    Ok(Hierarchy {
        annotations,
        next_id,
    })
}

fn hierarchy_file(hierarchy: &Hierarchy) -> HierarchyFile {
    HierarchyFile {
        next_id: hierarchy.next_id,
        annotations: hierarchy
            .annotations
            .iter()
            .map(|annotation| AnnotationRecord {
                id: annotation.id,
                name: annotation.name.clone(),
                path_class: annotation.path_class.clone(),
                roi: GeoJsonPolygon::from(&annotation.roi),
            })
            .collect(),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
