//! RF2 filename classification.
//!
//! Release filenames encode their contents:
//!
//! ```text
//! sct2_Concept_Snapshot_INT_20240101.txt
//! sct2_Description_Snapshot-en_INT_20240101.txt
//! der2_cRefset_LanguageSnapshot-en_INT_20240101.txt
//! der2_Refset_SimpleDelta_GB1000000_20240401.txt
//! ```
//!
//! The segment carrying `Full`, `Snapshot`, or `Delta` also carries the
//! refset content subtype as its prefix (`LanguageSnapshot`) and an
//! optional language tag after a hyphen (`Snapshot-en`).

use std::path::{Path, PathBuf};

/// Release type of an RF2 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseType {
    /// Every version of every component.
    Full,
    /// The current version of every component.
    Snapshot,
    /// Components changed since the previous release.
    Delta,
}

impl ReleaseType {
    fn from_segment(segment: &str) -> Option<(Self, &str)> {
        for (word, ty) in [
            ("Full", Self::Full),
            ("Snapshot", Self::Snapshot),
            ("Delta", Self::Delta),
        ] {
            if let Some(idx) = segment.find(word) {
                // The release word must end the segment (bar a language tag).
                let rest = &segment[idx + word.len()..];
                if rest.is_empty() || rest.starts_with('-') {
                    return Some((ty, &segment[..idx]));
                }
            }
        }
        None
    }
}

/// Component type a release file contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Concept rows.
    Concept,
    /// Description rows. Text-definition files decode here too: they share
    /// the description columns and carry the definition type id.
    Description,
    /// Relationship rows, stated or inferred.
    Relationship,
    /// Reference-set member rows of any schema.
    Refset,
}

/// A classified RF2 release file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Which component table its rows belong to.
    pub component: ComponentKind,
    /// Full, snapshot, or delta.
    pub release_type: ReleaseType,
    /// Refset content subtype from the filename, e.g. `"Language"` or
    /// `"Simple"`. Empty-prefix refset files and the primary component
    /// files have `None`.
    pub content_subtype: Option<String>,
    /// Language tag, e.g. `"en"`, when the filename carries one.
    pub language: Option<String>,
    /// Release date `YYYYMMDD` from the filename, when present.
    pub version_date: Option<String>,
}

impl ReleaseFile {
    /// Classifies a path by its RF2 filename, returning `None` for
    /// files that are not recognisable RF2 component files.
    pub fn classify<P: AsRef<Path>>(path: P) -> Option<ReleaseFile> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".txt")?;

        let parts: Vec<&str> = stem.split('_').collect();
        if parts.len() < 3 {
            return None;
        }

        let component = classify_component(&parts)?;

        let (release_type, subtype_prefix, language) = parts.iter().find_map(|segment| {
            let (ty, prefix) = ReleaseType::from_segment(segment)?;
            let language = segment
                .rsplit_once('-')
                .map(|(_, lang)| lang.to_string())
                .filter(|lang| !lang.is_empty());
            Some((ty, prefix, language))
        })?;

        let content_subtype = match component {
            ComponentKind::Refset if !subtype_prefix.is_empty() => {
                Some(subtype_prefix.to_string())
            }
            _ => None,
        };

        Some(ReleaseFile {
            path: path.to_path_buf(),
            component,
            release_type,
            content_subtype,
            language,
            version_date: extract_version_date(&parts),
        })
    }

    /// The filename as a display string, for error context.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn classify_component(parts: &[&str]) -> Option<ComponentKind> {
    for part in parts {
        match *part {
            "Concept" => return Some(ComponentKind::Concept),
            "Description" | "TextDefinition" => return Some(ComponentKind::Description),
            "Relationship" | "StatedRelationship" => return Some(ComponentKind::Relationship),
            _ => {
                if part.ends_with("Refset") {
                    return Some(ComponentKind::Refset);
                }
            }
        }
    }
    None
}

/// The trailing 8-digit segment is the release date.
fn extract_version_date(parts: &[&str]) -> Option<String> {
    let last = parts.last()?;
    if last.len() == 8 && last.chars().all(|c| c.is_ascii_digit()) {
        Some((*last).to_string())
    } else {
        None
    }
}
