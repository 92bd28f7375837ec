// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files.

use std::path::PathBuf;

use glob::glob;
use log::trace;
use thiserror::Error;

/// Given a glob pattern, get all of the matches from the filesystem. Matches
/// are sorted alphabetically.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// The same as `get_all_matches_from_glob`, but at least one result is
/// expected to be returned from the glob match.
pub(crate) fn get_nonempty_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let entries = get_all_matches_from_glob(g)?;
    if entries.is_empty() {
        return Err(GlobError::NoMatches {
            glob: g.to_string(),
        });
    }
    Ok(entries)
}

/// Turn user-supplied input file names into paths. Anything containing glob
/// metacharacters is expanded (and must match something); anything else is
/// taken literally. The order of the inputs is kept.
pub(crate) fn expand_input_globs(inputs: &[String]) -> Result<Vec<PathBuf>, GlobError> {
    let mut paths = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let matches = get_nonempty_matches_from_glob(input)?;
            trace!("Glob {input} matched {} files", matches.len());
            paths.extend(matches);
        } else {
            paths.push(PathBuf::from(input));
        }
    }
    Ok(paths)
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No glob matches were found for {glob}")]
    NoMatches { glob: String },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use tempfile::TempDir;

    use super::*;

    fn make_files(dir: &TempDir, names: &[&str]) {
        for name in names {
            File::create(dir.path().join(name)).expect("couldn't make a file");
        }
    }

    #[test]
    fn test_glob_channel_suffix() {
        let dir = TempDir::new().unwrap();
        make_files(
            &dir,
            &[
                "b_channel_0001.fits",
                "a_channel_0001.fits",
                "a_channel_0000.fits",
                "b_channel_0000.fits",
            ],
        );

        let pattern = format!(
            "{}/*channel_0001*",
            glob::Pattern::escape(&dir.path().display().to_string())
        );
        let matches = get_nonempty_matches_from_glob(&pattern).unwrap();
        assert_eq!(
            matches,
            vec![
                dir.path().join("a_channel_0001.fits"),
                dir.path().join("b_channel_0001.fits")
            ]
        );
    }

    #[test]
    fn test_glob_no_matches() {
        let dir = TempDir::new().unwrap();
        let pattern = format!(
            "{}/*channel_0009*",
            glob::Pattern::escape(&dir.path().display().to_string())
        );
        assert!(get_all_matches_from_glob(&pattern).unwrap().is_empty());
        assert!(matches!(
            get_nonempty_matches_from_glob(&pattern),
            Err(GlobError::NoMatches { .. })
        ));
    }

    #[test]
    fn test_expand_input_globs() {
        let dir = TempDir::new().unwrap();
        make_files(&dir, &["cube1.fits", "cube2.fits", "notes.txt"]);
        let d = dir.path().display().to_string();

        let inputs = vec![format!("{d}/notes.txt"), format!("{d}/cube*.fits")];
        let paths = expand_input_globs(&inputs).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("notes.txt"),
                dir.path().join("cube1.fits"),
                dir.path().join("cube2.fits"),
            ]
        );

        // Literal paths don't have to exist (yet).
        let paths = expand_input_globs(&[format!("{d}/missing.fits")]).unwrap();
        assert_eq!(paths, vec![dir.path().join("missing.fits")]);

        // Globs do.
        assert!(expand_input_globs(&[format!("{d}/missing*.fits")]).is_err());
    }
}
