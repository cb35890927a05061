//! Media discovery: images under `<media>/images` that the render thread can
//! decode.

use serde::Serialize;
use std::fs;
use std::path::Path;

/// Extensions the `image` crate is built to decode here.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// An image file available for display.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImageEntry {
    /// Filename (e.g., "sunset.png")
    pub name: String,
    /// Relative path from media dir (e.g., "images/sunset.png")
    pub path: String,
    /// File size in bytes
    pub size: u64,
    /// Pixel width from the file header, if it could be read
    pub width: Option<u32>,
    /// Pixel height from the file header, if it could be read
    pub height: Option<u32>,
}

fn is_displayable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// List displayable images, sorted by name. A missing directory is empty.
pub fn list_images(media_dir: &Path) -> Vec<ImageEntry> {
    let Ok(read_dir) = fs::read_dir(media_dir.join("images")) else {
        return Vec::new();
    };

    let mut entries: Vec<ImageEntry> = read_dir
        .flatten()
        .filter(|entry| entry.path().is_file() && is_displayable(&entry.path()))
        .map(|entry| {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let (width, height) = match image::image_dimensions(&path) {
                Ok((w, h)) => (Some(w), Some(h)),
                Err(_) => (None, None),
            };
            ImageEntry {
                path: format!("images/{name}"),
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
                name,
                width,
                height,
            }
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
