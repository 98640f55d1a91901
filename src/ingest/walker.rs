use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{RelgraphError, Result};

/// A relationship input file found under a batch root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub extension: String,
}

impl InputFile {
    /// File name without extension, used to name the generated diagram
    pub fn stem(&self) -> &str {
        self.absolute_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("diagram")
    }

    /// Relative path without its extension, `/`-separated. Unlike the stem
    /// this is unique within one batch root.
    pub fn key(&self) -> String {
        let relative = Path::new(&self.relative_path).with_extension("");
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Where an output with `extension` goes: beside the input, or at the
    /// input's relative location under `out_dir`.
    pub fn output_path(&self, out_dir: Option<&Path>, extension: &str) -> PathBuf {
        match out_dir {
            Some(dir) => dir.join(&self.relative_path).with_extension(extension),
            None => self.absolute_path.with_extension(extension),
        }
    }
}

/// Discover relationship inputs (`.json`, `.csv`) under `root`.
///
/// Extensions are matched case-insensitively. Results are sorted by relative
/// path so batch runs process files in a stable order.
pub fn discover_inputs(root: &Path) -> Result<Vec<InputFile>> {
    if !root.is_dir() {
        return Err(RelgraphError::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() {
            continue;
        }

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if !matches!(extension.as_str(), "json" | "csv") {
            continue;
        }

        let relative_path = path
            .strip_prefix(root)
            .map_err(|_| {
                RelgraphError::Config(format!(
                    "Failed to compute relative path for: {}",
                    path.display()
                ))
            })?
            .to_string_lossy()
            .to_string();

        files.push(InputFile {
            relative_path,
            absolute_path: path.to_path_buf(),
            extension,
        });
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    log::info!("Discovered {} input files in {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("chapter2")).unwrap();
        fs::write(root.join("q2.json"), "{}").unwrap();
        fs::write(root.join("q1.CSV"), "A,directed,x,B").unwrap();
        fs::write(root.join("chapter2/q3.json"), "[]").unwrap();
        fs::write(root.join("notes.md"), "# notes").unwrap();
        fs::write(root.join("q1.mmd"), "graph LR").unwrap();

        let files = discover_inputs(root).unwrap();

        assert_eq!(files.len(), 3);
        let stems: Vec<&str> = files.iter().map(|f| f.stem()).collect();
        assert_eq!(stems, vec!["q3", "q1", "q2"]);
        assert_eq!(files[1].extension, "csv");
    }

    #[test]
    fn test_same_stem_in_subdirs_gets_distinct_outputs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("a")).unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("a/q1.json"), "{}").unwrap();
        fs::write(root.join("b/q1.json"), "{}").unwrap();

        let files = discover_inputs(root).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].stem(), files[1].stem());

        let keys: Vec<String> = files.iter().map(|f| f.key()).collect();
        assert_eq!(keys, vec!["a/q1", "b/q1"]);

        let out = Path::new("/tmp/out");
        assert_eq!(files[0].output_path(Some(out), "mmd"), out.join("a").join("q1.mmd"));
        assert_eq!(files[1].output_path(Some(out), "png"), out.join("b").join("q1.png"));
        assert_eq!(files[0].output_path(None, "mmd"), root.join("a").join("q1.mmd"));
    }

    #[test]
    fn test_discover_inputs_empty() {
        let temp_dir = TempDir::new().unwrap();
        let files = discover_inputs(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_discover_inputs_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let result = discover_inputs(&temp_dir.path().join("missing"));
        assert!(matches!(result, Err(RelgraphError::InvalidInput(_))));
    }
}
