use clap::Parser;
use std::path::PathBuf;

use crate::project::ImageType;

/// Import legacy `.itn` polygon annotations into an annotation project.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ImportArgs {
    /// Source directory of the sample folders
    #[arg(short = 's', long = "src-dir", default_value = "./unn_data/Aperio/R46")]
    pub src_dir: PathBuf,

    /// Annotation project directory, created if absent
    #[arg(short = 'p', long = "project", default_value = "domore_qupath")]
    pub project: PathBuf,

    /// Name prefix of regular tissue folders directly under the source directory
    #[arg(long = "prefix", default_value = "R46")]
    pub prefix: String,

    /// Directory under the source directory holding other tissue folders
    #[arg(long = "other-dir", default_value = "Other_tissue")]
    pub other_dir: String,

    /// Image type recorded for every added slide
    #[arg(long = "image-type", value_enum, default_value = "brightfield-h-e")]
    pub image_type: ImageType,

    /// Class vocabulary as NAME:COLOR, in order (replaces the default classes)
    #[arg(long = "class", value_name = "NAME:COLOR", value_parser = parse_class_spec)]
    pub classes: Vec<ClassSpec>,
}

impl ImportArgs {
    /// Classes given on the command line, or the default vocabulary
    pub fn vocabulary(&self) -> ClassVocabulary {
        if self.classes.is_empty() {
            ClassVocabulary::default()
        } else {
            ClassVocabulary::new(self.classes.clone())
        }
    }
}

/// Export annotations of a project to legacy `.itn` polygon files.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct ExportArgs {
    /// Annotation project directory to read
    #[arg(short = 'p', long = "project", default_value = "domore_qupath")]
    pub project: PathBuf,

    /// Output root, deleted and recreated on every run
    #[arg(short = 'o', long = "output-dir", default_value = "./annotations")]
    pub output_dir: PathBuf,
}

/// A named class with a packed Java ARGB color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSpec {
    pub name: String,
    pub color: i32,
}

impl ClassSpec {
    pub fn new(name: &str, color: i32) -> Self {
        Self {
            name: name.to_string(),
            color,
        }
    }
}

/// Ordered class vocabulary registered into a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    classes: Vec<ClassSpec>,
}

impl ClassVocabulary {
    pub fn new(classes: Vec<ClassSpec>) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &[ClassSpec] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::new(vec![
            ClassSpec::new("Unused", 0),
            ClassSpec::new("Border", -9408287),
        ])
    }
}

// Parse NAME:COLOR where COLOR is a signed ARGB integer or #RRGGBB
pub fn parse_class_spec(s: &str) -> Result<ClassSpec, String> {
    let (name, color) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected NAME:COLOR, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("class name must not be empty".to_string());
    }
    let color = color.trim();
    let color = if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return Err(format!("expected #RRGGBB, got '{}'", color));
        }
        let rgb = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
        (0xFF00_0000 | rgb) as i32
    } else {
        color
            .parse::<i32>()
            .map_err(|_| format!("invalid color '{}'", color))?
    };
    Ok(ClassSpec::new(name, color))
}
