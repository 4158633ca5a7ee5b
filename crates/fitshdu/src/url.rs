//! URL-type prefixes and the extended file-name syntax accepted by `open`.
//!
//! ```text
//! file://data/obs.fits[2]        third HDU (extension 2)
//! obs.fits[EVENTS]               first HDU named EVENTS
//! obs.fits[SCI, 3]               HDU named SCI with EXTVER = 3
//! ```

use std::path::PathBuf;

use crate::error::{Error, Result};

/// URL type of a handle backed by a local file.
pub const FILE_URL: &str = "file://";

/// URL type of a handle backed by an in-memory byte image.
pub const MEM_URL: &str = "mem://";

/// HDU requested by a bracketed suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HduSelector {
    /// Extension number, 0 being the primary HDU.
    Index(usize),
    /// Move by name with any HDU type; version 0 matches any version.
    Name { name: String, version: u32 },
}

/// A file name split into the path to read and an optional HDU selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub selector: Option<HduSelector>,
}

/// Split an extended file name.
pub fn parse_file_name(name: &str) -> Result<FileSpec> {
    let bad = || Error::BadFileName(name.to_string());

    let rest = name.strip_prefix(FILE_URL).unwrap_or(name);
    if rest.contains("://") {
        return Err(bad());
    }

    let (path, selector) = match rest.strip_suffix(']') {
        Some(head) => {
            let open = head.rfind('[').ok_or_else(bad)?;
            let selector = parse_selector(&head[open + 1..]).ok_or_else(bad)?;
            (&head[..open], Some(selector))
        }
        None => (rest, None),
    };

    if path.is_empty() {
        return Err(bad());
    }
    Ok(FileSpec {
        path: PathBuf::from(path),
        selector,
    })
}

fn parse_selector(text: &str) -> Option<HduSelector> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok().map(HduSelector::Index);
    }
    let (name, version) = match text.split_once(',') {
        Some((name, version)) => (name.trim(), version.trim().parse().ok()?),
        None => (text, 0),
    };
    if name.is_empty() {
        return None;
    }
    Some(HduSelector::Name {
        name: name.to_string(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path() {
        let spec = parse_file_name("data/obs.fits").unwrap();
        assert_eq!(spec.path, PathBuf::from("data/obs.fits"));
        assert!(spec.selector.is_none());
    }

    #[test]
    fn file_prefix_is_stripped() {
        let spec = parse_file_name("file:///tmp/obs.fits").unwrap();
        assert_eq!(spec.path, PathBuf::from("/tmp/obs.fits"));
    }

    #[test]
    fn index_selector() {
        let spec = parse_file_name("obs.fits[1]").unwrap();
        assert_eq!(spec.path, PathBuf::from("obs.fits"));
        assert_eq!(spec.selector, Some(HduSelector::Index(1)));
    }

    #[test]
    fn name_selector() {
        let spec = parse_file_name("obs.fits[IUE MELO]").unwrap();
        assert_eq!(
            spec.selector,
            Some(HduSelector::Name {
                name: String::from("IUE MELO"),
                version: 0,
            })
        );
    }

    #[test]
    fn name_and_version_selector() {
        let spec = parse_file_name("file://obs.fits[ SCI , 3 ]").unwrap();
        assert_eq!(spec.path, PathBuf::from("obs.fits"));
        assert_eq!(
            spec.selector,
            Some(HduSelector::Name {
                name: String::from("SCI"),
                version: 3,
            })
        );
    }

    #[test]
    fn malformed_names() {
        for name in [
            "",
            "obs.fits[]",
            "obs.fits]",
            "[1]",
            "obs.fits[SCI, x]",
            "obs.fits[, 2]",
            "https://example.org/obs.fits",
        ] {
            match parse_file_name(name) {
                Err(Error::BadFileName(n)) => assert_eq!(n, name),
                other => panic!("Expected BadFileName for {name:?}, got {:?}", other),
            }
        }
    }
}
