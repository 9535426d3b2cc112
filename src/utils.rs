use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
            label
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("#>-"));
    pb
}

/// Remove a directory if present and create it empty
pub fn recreate_directory(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        log::info!("Directory {:?} already exists. Deleting and recreating it.", path);
        fs::remove_dir_all(path).and_then(|_| fs::create_dir_all(path))?;
    } else {
        fs::create_dir_all(path)?;
    }
    Ok(path.to_path_buf())
}

/// File name without its last extension, as a lossy UTF-8 string
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Group folder of an image: the part of its stem before the first underscore
pub fn group_folder_name(image_name: &str) -> String {
    let stem = file_stem_string(Path::new(image_name));
    stem.split('_').next().unwrap_or_default().to_string()
}
