//! Walking the cache directory tree.

use std::{
	fs::{self, DirEntry},
	path::{Path, PathBuf},
	time::{Duration, SystemTime},
};

/// Extension of tile content files.
pub(crate) const CONTENT_EXTENSION: &str = "tile";
/// Extension of validation token files, stored next to their content file.
pub(crate) const TOKEN_EXTENSION: &str = "etag";
/// Extension of temporary files that are renamed into place once fully written.
pub(crate) const PARTIAL_EXTENSION: &str = "partial";

/// A content file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentFile {
	pub path: PathBuf,
	pub size: u64,
	pub modified: SystemTime,
}

/// Calls `visit` for every regular content file below `root`.
///
/// Directories that turn out to be symbolic links out of their parent are not entered.
/// Unreadable directories and entries are skipped.
pub(crate) fn visit_content_files(root: &Path, visit: &mut dyn FnMut(ContentFile)) {
	walk_files(root, &mut |entry| {
		if is_content_file(&entry.path())
			&& let Some(file) = content_file(entry)
		{
			visit(file);
		}
	});
}

/// Deletes temporary files of interrupted writes that were last modified at least
/// `min_age` ago. Returns how many were deleted.
pub(crate) fn remove_stale_partial_files(root: &Path, min_age: Duration) -> usize {
	let mut removed = 0;
	walk_files(root, &mut |entry| {
		let path = entry.path();
		if !path.extension().is_some_and(|extension| extension == PARTIAL_EXTENSION) {
			return;
		}
		let Ok(metadata) = entry.metadata() else {
			return;
		};
		// a modification time in the future counts as fresh
		let age = metadata
			.modified()
			.ok()
			.and_then(|modified| modified.elapsed().ok())
			.unwrap_or_default();
		if metadata.is_file() && age >= min_age {
			match fs::remove_file(&path) {
				Ok(()) => removed += 1,
				Err(e) => log::debug!("could not delete {path:?}: {e}"),
			}
		}
	});
	removed
}

fn walk_files(dir: &Path, visit: &mut dyn FnMut(&DirEntry)) {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) => {
			log::debug!("skipping unreadable directory {dir:?}: {e}");
			return;
		}
	};

	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_dir() {
			if is_symbolic_dir_link(dir, &path) {
				log::debug!("not following directory link {path:?}");
				continue;
			}
			walk_files(&path, visit);
		} else {
			visit(&entry);
		}
	}
}

/// All content files below `root`, oldest modification time first.
pub(crate) fn list_content_files_oldest_first(root: &Path) -> Vec<ContentFile> {
	let mut files = Vec::new();
	visit_content_files(root, &mut |file| files.push(file));
	files.sort_by_key(|file| file.modified);
	files
}

pub(crate) fn is_content_file(path: &Path) -> bool {
	path.extension().is_some_and(|extension| extension == CONTENT_EXTENSION)
}

/// Path of the token file that belongs to a content file.
pub(crate) fn token_path_of(content_path: &Path) -> PathBuf {
	content_path.with_extension(TOKEN_EXTENSION)
}

fn content_file(entry: &DirEntry) -> Option<ContentFile> {
	// `DirEntry::metadata` does not follow symlinks, so linked files are not counted.
	let metadata = entry.metadata().ok()?;
	if !metadata.is_file() {
		return None;
	}
	Some(ContentFile {
		path: entry.path(),
		size: metadata.len(),
		modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
	})
}

/// A directory is a link if its canonical parent differs from the canonical path of the
/// directory it was found in. If either path cannot be resolved, it is assumed to be a link.
fn is_symbolic_dir_link(parent: &Path, dir: &Path) -> bool {
	let Ok(canonical_parent) = parent.canonicalize() else {
		return true;
	};
	let Ok(canonical_dir) = dir.canonicalize() else {
		return true;
	};
	canonical_dir.parent() != Some(canonical_parent.as_path())
}
