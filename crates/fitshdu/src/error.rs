use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// All errors that can occur while opening, navigating or editing a FITS file.
///
/// Each variant maps onto the numeric status code the CFITSIO library uses for
/// the same condition, see [`Error::status`].
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened or read.
    #[error("could not open FITS file {}: {source}", .path.display())]
    FileNotOpened {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A new file could not be written.
    #[error("could not create FITS file {}: {source}", .path.display())]
    FileNotCreated {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// `create` was asked to replace an existing file without `overwrite`.
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),
    /// Writing to a sink or flushing to disk failed.
    #[error("write error: {0}")]
    Write(#[source] io::Error),
    /// Tried to move past the last HDU.
    #[error("tried to move past end of file")]
    EndOfFile,
    /// Premature end of data while reading a header or data segment.
    #[error("unexpected end of data")]
    UnexpectedEof,
    /// Tried to modify a file opened read-only.
    #[error("cannot write to a read-only file")]
    ReadOnlyFile,
    /// The requested keyword does not exist in the current header.
    #[error("keyword not found: {0}")]
    KeyNotFound(String),
    /// Malformed keyword name in a header card.
    #[error("illegal character in keyword name")]
    InvalidKeyword,
    /// The keyword fixes the HDU structure and cannot be rewritten in place.
    #[error("keyword {0} defines the HDU layout and cannot be changed")]
    ReservedKeyword(String),
    /// Malformed FITS header structure.
    #[error("invalid FITS header: {0}")]
    InvalidHeader(&'static str),
    /// A mandatory keyword is absent or out of place.
    #[error("missing required keyword: {0}")]
    MissingKeyword(&'static str),
    /// XTENSION names a type other than IMAGE, TABLE or BINTABLE.
    #[error("unknown XTENSION type: {0}")]
    UnknownExtension(String),
    /// Invalid HDU number, or no HDU matches a name/type/version request.
    #[error("illegal HDU number")]
    BadHduNum,
    /// A keyword value cannot be converted to the requested type.
    #[error("keyword {0} has the wrong value type")]
    BadKeywordType(String),
    /// The extended file-name syntax could not be parsed.
    #[error("bad file name: {0}")]
    BadFileName(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The CFITSIO status code for this condition.
    pub fn status(&self) -> i32 {
        match self {
            Error::FileNotOpened { .. } => 104,
            Error::FileNotCreated { .. } | Error::FileExists(_) => 105,
            Error::Write(_) => 106,
            Error::EndOfFile => 107,
            Error::UnexpectedEof => 108,
            Error::ReadOnlyFile => 112,
            Error::BadFileName(_) => 125,
            Error::KeyNotFound(_) => 202,
            Error::InvalidKeyword | Error::ReservedKeyword(_) => 207,
            Error::UnknownExtension(_) => 251,
            Error::InvalidHeader(_) | Error::MissingKeyword(_) => 252,
            Error::BadHduNum => 301,
            Error::BadKeywordType(_) => 404,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_end_of_file() {
        assert_eq!(
            Error::EndOfFile.to_string(),
            "tried to move past end of file"
        );
    }

    #[test]
    fn display_bad_hdu_num() {
        assert_eq!(Error::BadHduNum.to_string(), "illegal HDU number");
    }

    #[test]
    fn display_missing_keyword() {
        let e = Error::MissingKeyword("NAXIS");
        assert_eq!(e.to_string(), "missing required keyword: NAXIS");
    }

    #[test]
    fn display_file_not_opened() {
        let e = Error::FileNotOpened {
            path: PathBuf::from("nope.fits"),
            source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
        };
        assert_eq!(
            e.to_string(),
            "could not open FITS file nope.fits: file not found"
        );
    }

    #[test]
    fn navigation_status_codes() {
        assert_eq!(Error::EndOfFile.status(), 107);
        assert_eq!(Error::BadHduNum.status(), 301);
        assert_ne!(Error::EndOfFile.status(), Error::BadHduNum.status());
    }

    #[test]
    fn other_status_codes() {
        assert_eq!(Error::ReadOnlyFile.status(), 112);
        assert_eq!(Error::KeyNotFound("X".into()).status(), 202);
        assert_eq!(Error::Write(io::Error::other("x")).status(), 106);
        assert_eq!(Error::UnknownExtension("FOREIGN".into()).status(), 251);
        assert_eq!(Error::ReservedKeyword("NAXIS1".into()).status(), 207);
    }

    #[test]
    fn std_error_source() {
        use std::error::Error as StdError;

        assert!(Error::InvalidHeader("x").source().is_none());
        let e = Error::Write(io::Error::other("inner"));
        assert!(e.source().is_some());
    }
}
