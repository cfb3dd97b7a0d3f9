//! Path arithmetic between the config file, the working directory and the
//! generated artifacts.
//!
//! Paths in the configuration are relative to the configuration file. Two
//! questions get asked about them: where to read or write the file from the
//! process's point of view ([`resolve_for_io`]), and how one generated text
//! artifact should refer to another ([`resolve_for_reference`]).
use std::path::{Component, Path, PathBuf};

use crate::Glyphs2FontError;

/// Folds `.` and `..` components without touching the filesystem.
///
/// `..` directly below a root is dropped; leading `..` of a relative path
/// is kept, since there is nothing to cancel it against.
pub fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => components.push(component),
            },
            c => components.push(c),
        }
    }
    components.iter().collect()
}

fn dirname(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

fn basename(path: &Path) -> &Path {
    path.file_name().map(Path::new).unwrap_or_else(|| Path::new(""))
}

/// Where to perform I/O on `target`, a path written in `config_file`.
///
/// The result is relative to the current working directory.
pub fn resolve_for_io(target: &Path, config_file: &Path) -> Result<PathBuf, Glyphs2FontError> {
    let cwd = std::env::current_dir().map_err(|e| Glyphs2FontError::io(".", e))?;
    Ok(resolve_for_io_from(target, config_file, &cwd))
}

/// [`resolve_for_io`] against an explicit working directory, which must be
/// absolute.
pub fn resolve_for_io_from(target: &Path, config_file: &Path, cwd: &Path) -> PathBuf {
    let full = config_anchored(target, config_file, cwd);
    match pathdiff::diff_paths(&full, cwd) {
        Some(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
        Some(rel) => rel,
        None => full,
    }
}

/// The absolute location of `target` as written in `config_file`.
pub fn config_anchored(target: &Path, config_file: &Path, cwd: &Path) -> PathBuf {
    // Joining an absolute path replaces the base, so absolute inputs pass through.
    let dir = normalize(&cwd.join(dirname(config_file)).join(dirname(target)));
    dir.join(basename(target))
}

/// How an artifact at `referencing` should refer to `target` in a `url()`
/// or `href`.
///
/// Pure path arithmetic between the two locations; the working directory
/// is not consulted. Separators are always `/`.
pub fn resolve_for_reference(target: &Path, referencing: &Path) -> String {
    let root = Path::new("/");
    let target_dir = normalize(&root.join(dirname(target)));
    let base_dir = normalize(&root.join(dirname(referencing)));
    let relative_dir = pathdiff::diff_paths(&target_dir, &base_dir).unwrap_or(target_dir);

    let mut parts: Vec<String> = relative_dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect();
    parts.push(basename(target).to_string_lossy().into_owned());
    parts.join("/")
}
