//! Textual include expansion.
//!
//! A line whose first word is `include` followed by a quoted path splices in
//! the referenced file, resolved relative to the file doing the including.
//! Inclusion nests; a file including itself, directly or through a chain, is
//! an error. A malformed directive is passed through as ordinary source and
//! left for the compiler to complain about.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("could not open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("circular include detected for '{}'", .0.display())]
    CircularInclude(PathBuf),
}

/// Read `path` and expand its include directives recursively.
pub fn expand(path: &Path) -> Result<String, PreprocessError> {
    let mut included = HashSet::new();
    let mut out = String::new();
    process_file(path, &mut included, &mut out)?;
    Ok(out)
}

fn process_file(
    path: &Path,
    included: &mut HashSet<PathBuf>,
    out: &mut String,
) -> Result<(), PreprocessError> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !included.insert(key.clone()) {
        return Err(PreprocessError::CircularInclude(path.to_path_buf()));
    }

    let text = std::fs::read_to_string(path).map_err(|source| PreprocessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    for line in text.lines() {
        match line.strip_prefix("include").and_then(quoted_target) {
            Some(target) => process_file(&dir.join(target), included, out)?,
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    // A file may be included again later, just not within itself.
    included.remove(&key);
    Ok(())
}

fn quoted_target(rest: &str) -> Option<&str> {
    let open = rest.find('"')?;
    let close = rest[open + 1..].find('"')?;
    Some(&rest[open + 1..open + 1 + close])
}
