use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::{ImpostorError, Result};

/// Reads a text file and returns all its lines as a `Vec<String>`.
///
/// - Reads the entire file into memory
/// - Splits on `\n` / `\r\n`
/// - Invalid UTF-8 sequences are replaced rather than rejected
pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	let path = filename.as_ref();
	let mut bytes = Vec::new();
	File::open(path)
		.and_then(|mut f| f.read_to_end(&mut bytes))
		.map_err(|e| ImpostorError::io(e, path))?;
	Ok(String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect())
}

/// Like `read_file`, but a missing file yields no lines.
pub fn read_optional_file<P: AsRef<Path>>(filename: P) -> Result<Vec<String>> {
	if !filename.as_ref().is_file() {
		return Ok(Vec::new());
	}
	read_file(filename)
}

/// Extracts the base filename without extension.
///
/// Examples:
/// - `"./sources/saoi.src"` → `"saoi"`
/// - `"saoi.src"` → `"saoi"`
pub fn get_filename<P: AsRef<Path>>(input_path: P) -> Result<String> {
	let path = input_path.as_ref();
	let stem = path.file_stem().ok_or_else(|| {
		ImpostorError::io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path has no filename"), path)
	})?;

	Ok(stem.to_string_lossy().to_string())
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub fn normalize_folder(input: &Path) -> PathBuf {
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Lists all files with a given extension in a directory, sorted by name.
///
/// Returns full paths.
pub fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
	let dir = dir.as_ref();
	let mut files = Vec::new();

	for entry in fs::read_dir(dir).map_err(|e| ImpostorError::io(e, dir))? {
		let path = entry.map_err(|e| ImpostorError::io(e, dir))?.path();
		if path.is_file() && path.extension() == Some(std::ffi::OsStr::new(extension)) {
			files.push(path);
		}
	}

	files.sort();
	Ok(files)
}

/// Parses `key=value value...` lines.
///
/// Lines without exactly one `=` are skipped; values are whitespace-separated.
/// A later line with the same key replaces the earlier one.
pub fn parse_meta<I, S>(lines: I) -> HashMap<String, Vec<String>>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut meta = HashMap::new();
	for line in lines {
		let parts: Vec<&str> = line.as_ref().trim().split('=').collect();
		if parts.len() != 2 {
			continue;
		}
		let values = parts[1].split_whitespace().map(str::to_owned).collect();
		meta.insert(parts[0].to_owned(), values);
	}
	meta
}

/// Reads the alias file (`canonical alias alias...` per line); a missing file yields no lines.
pub fn read_merge_info<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
	read_optional_file(path)
}

/// Loads a metadata file; a missing file yields an empty map.
pub fn load_meta<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<String>>> {
	Ok(parse_meta(read_optional_file(path)?))
}
