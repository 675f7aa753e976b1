//! Release-file discovery.

use std::fs;
use std::path::Path;

use crate::error::{Rf2Error, Rf2Result};
use crate::filename::ReleaseFile;

/// Walks the given paths and returns every recognisable RF2 component
/// file beneath them, in path order.
///
/// A path may be a release root, any directory inside one, or a single
/// file. Files whose names do not match an RF2 pattern are skipped;
/// passing a nonexistent path is an error.
pub fn discover_release_files<P: AsRef<Path>>(paths: &[P]) -> Rf2Result<Vec<ReleaseFile>> {
    let mut files = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Rf2Error::PathNotFound {
                path: path.display().to_string(),
            });
        }
        if path.is_file() {
            match ReleaseFile::classify(path) {
                Some(file) => files.push(file),
                None => {
                    return Err(Rf2Error::UnrecognisedFile {
                        path: path.display().to_string(),
                    })
                }
            }
        } else {
            walk(path, &mut files)?;
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<ReleaseFile>) -> Rf2Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, files)?;
        } else if let Some(file) = ReleaseFile::classify(&path) {
            files.push(file);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::ComponentKind;
    use std::fs::File;
    use std::io::Write;

    fn touch(dir: &Path, name: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        writeln!(f, "id\teffectiveTime").unwrap();
    }

    #[test]
    fn discovers_recursively_and_skips_noise() {
        let tmp = tempfile::tempdir().unwrap();
        let terminology = tmp.path().join("Snapshot").join("Terminology");
        let refsets = tmp.path().join("Snapshot").join("Refset").join("Language");
        fs::create_dir_all(&terminology).unwrap();
        fs::create_dir_all(&refsets).unwrap();

        touch(&terminology, "sct2_Concept_Snapshot_INT_20240101.txt");
        touch(&terminology, "sct2_Description_Snapshot-en_INT_20240101.txt");
        touch(&refsets, "der2_cRefset_LanguageSnapshot-en_INT_20240101.txt");
        touch(tmp.path(), "Readme.txt");

        let files = discover_release_files(&[tmp.path()]).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files
            .iter()
            .any(|f| f.component == ComponentKind::Refset));
    }

    #[test]
    fn explicit_unknown_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Readme.txt");
        let err = discover_release_files(&[tmp.path().join("Readme.txt")]).unwrap_err();
        assert!(matches!(err, Rf2Error::UnrecognisedFile { .. }));
    }

    #[test]
    fn missing_path_is_an_error() {
        let err = discover_release_files(&[Path::new("/no/such/release")]).unwrap_err();
        assert!(matches!(err, Rf2Error::PathNotFound { .. }));
    }
}
