//! The `FitsFile` handle: lifecycle, HDU cursor and header access.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::header::{serialize_header, Card};
use crate::keys::{ReadsKey, WritesKey};
use crate::layout::{rebuild, scan_hdus, Hdu, HduType};
use crate::url::{parse_file_name, HduSelector, FILE_URL, MEM_URL};
use crate::value::Value;

/// Whether a file is opened for reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// An open FITS file with a cursor on one of its HDUs.
///
/// The whole file is held in memory. HDU numbers are 1-based: the primary
/// HDU is number 1. A read-write handle with unsaved keyword changes is
/// written back by [`FitsFile::close`], by [`FitsFile::flush`], or on drop.
#[derive(Debug)]
pub struct FitsFile {
    data: Vec<u8>,
    name: String,
    path: Option<PathBuf>,
    url_type: &'static str,
    mode: OpenMode,
    hdus: Vec<Hdu>,
    current: usize,
    dirty: bool,
}

/// Builder for creating a new FITS file.
pub struct NewFitsFile {
    path: PathBuf,
    overwrite: bool,
}

impl FitsFile {
    /// Open an existing FITS file.
    ///
    /// `name` may carry a `file://` prefix and a trailing HDU selector such as
    /// `[1]` or `[EVENTS, 2]`; see [`crate::url`].
    pub fn open(name: &str, mode: OpenMode) -> Result<Self> {
        let spec = parse_file_name(name)?;
        let data = fs::read(&spec.path).map_err(|source| Error::FileNotOpened {
            path: spec.path.clone(),
            source,
        })?;
        let hdus = scan_hdus(&data)?;

        let mut file = FitsFile {
            data,
            name: name.to_string(),
            path: Some(spec.path),
            url_type: FILE_URL,
            mode,
            hdus,
            current: 0,
            dirty: false,
        };
        if let Some(selector) = &spec.selector {
            file.select(selector)?;
        }
        debug!(name, ?mode, hdus = file.hdus.len(), hdu = file.hdu_num(), "opened FITS file");
        Ok(file)
    }

    /// Wrap a FITS byte image held in memory. The handle is read-only.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self> {
        let hdus = scan_hdus(&data)?;
        debug!(name, hdus = hdus.len(), "opened in-memory FITS image");
        Ok(FitsFile {
            data,
            name: name.to_string(),
            path: None,
            url_type: MEM_URL,
            mode: OpenMode::ReadOnly,
            hdus,
            current: 0,
            dirty: false,
        })
    }

    /// Return a builder for creating a new FITS file.
    pub fn create<P: AsRef<Path>>(path: P) -> NewFitsFile {
        NewFitsFile {
            path: path.as_ref().to_path_buf(),
            overwrite: false,
        }
    }

    /// Release the handle, writing back unsaved changes.
    ///
    /// Unlike dropping the handle, a failed write is reported.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        debug!(name = %self.name, "closed FITS file");
        Ok(())
    }

    /// Write the in-memory image back to disk if it has unsaved changes.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty || self.mode == OpenMode::ReadOnly {
            return Ok(());
        }
        if let Some(path) = &self.path {
            fs::write(path, &self.data).map_err(Error::Write)?;
            debug!(path = %path.display(), bytes = self.data.len(), "flushed FITS file");
        }
        self.dirty = false;
        Ok(())
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The name exactly as passed to `open`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `"file://"` for files on disk, `"mem://"` for in-memory images.
    pub fn url_type(&self) -> &'static str {
        self.url_type
    }

    pub fn num_hdus(&self) -> usize {
        self.hdus.len()
    }

    /// The 1-based number of the current HDU.
    pub fn hdu_num(&self) -> usize {
        self.current + 1
    }

    pub fn hdu_type(&self) -> HduType {
        self.current_hdu().hdu_type()
    }

    pub fn current_hdu(&self) -> &Hdu {
        &self.hdus[self.current]
    }

    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    /// Move to HDU number `n` and return it.
    ///
    /// Fails with [`Error::BadHduNum`] for `n < 1` and with
    /// [`Error::EndOfFile`] past the last HDU; the cursor does not move on
    /// failure.
    pub fn mov_abs_hdu(&mut self, n: i64) -> Result<usize> {
        if n < 1 {
            return Err(Error::BadHduNum);
        }
        let index = usize::try_from(n - 1).map_err(|_| Error::EndOfFile)?;
        if index >= self.hdus.len() {
            return Err(Error::EndOfFile);
        }
        self.current = index;
        debug!(hdu = n, "moved to HDU");
        Ok(self.hdu_num())
    }

    /// Move `delta` HDUs forwards (or backwards when negative).
    pub fn mov_rel_hdu(&mut self, delta: i64) -> Result<usize> {
        let target = (self.hdu_num() as i64).checked_add(delta).ok_or(if delta > 0 {
            Error::EndOfFile
        } else {
            Error::BadHduNum
        })?;
        self.mov_abs_hdu(target)
    }

    /// Move to the first HDU matching type, name and version.
    ///
    /// `None` accepts any type and `version == 0` any version. Fails with
    /// [`Error::BadHduNum`] when nothing matches.
    pub fn mov_nam_hdu(
        &mut self,
        hdu_type: Option<HduType>,
        name: &str,
        version: u32,
    ) -> Result<usize> {
        let index = self
            .hdus
            .iter()
            .position(|hdu| hdu.matches(hdu_type, name, version))
            .ok_or(Error::BadHduNum)?;
        self.current = index;
        debug!(name, version, hdu = self.hdu_num(), "moved to named HDU");
        Ok(self.hdu_num())
    }

    fn select(&mut self, selector: &HduSelector) -> Result<usize> {
        match selector {
            HduSelector::Index(extension) => {
                let n = i64::try_from(*extension)
                    .ok()
                    .and_then(|e| e.checked_add(1))
                    .ok_or(Error::EndOfFile)?;
                self.mov_abs_hdu(n)
            }
            HduSelector::Name { name, version } => self.mov_nam_hdu(None, name, *version),
        }
    }

    /// Write the header of the current HDU as concatenated 80-byte records
    /// ending with END.
    pub fn write_hdu<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.current_hdu().header_text())
            .map_err(Error::Write)
    }

    /// Read a keyword of the current HDU.
    pub fn read_key<T: ReadsKey>(&self, name: &str) -> Result<T> {
        T::read_key(self.current_hdu(), name)
    }

    /// Set a keyword of the current HDU, appending it if absent.
    pub fn write_key<T: WritesKey + ?Sized>(&mut self, name: &str, value: &T) -> Result<()> {
        T::write_key(self, name, value)
    }

    pub(crate) fn put_value(&mut self, name: &str, value: Value) -> Result<()> {
        if self.mode == OpenMode::ReadOnly {
            return Err(Error::ReadOnlyFile);
        }
        if is_structural_keyword(name) {
            return Err(Error::ReservedKeyword(name.to_string()));
        }

        let mut hdus = self.hdus.clone();
        let cards = hdus[self.current].cards_mut();
        match cards
            .iter_mut()
            .find(|card| card.keyword_str() == name && !card.is_commentary())
        {
            Some(card) => card.set_value(value),
            None => {
                let card = Card::new(name, Some(value), None)?;
                // New keywords take the first reserved blank record, if any.
                let used = cards
                    .iter()
                    .rposition(|c| !c.is_blank_record())
                    .map_or(0, |i| i + 1);
                if used < cards.len() {
                    cards[used] = card;
                } else {
                    cards.push(card);
                }
            }
        }

        let data = rebuild(&self.data, &hdus);
        let rescanned = scan_hdus(&data)?;
        let same_layout = rescanned.len() == self.hdus.len()
            && rescanned
                .iter()
                .zip(&self.hdus)
                .all(|(new, old)| new.data_len == old.data_len && new.hdu_type() == old.hdu_type());
        if !same_layout {
            return Err(Error::InvalidHeader("keyword change alters the HDU layout"));
        }
        self.hdus = rescanned;
        self.data = data;
        self.dirty = true;
        debug!(keyword = name, hdu = self.hdu_num(), "updated header keyword");
        Ok(())
    }
}

/// Keywords that size or type an HDU. Rewriting them would reinterpret the
/// data segments that follow.
fn is_structural_keyword(name: &str) -> bool {
    match name {
        "SIMPLE" | "XTENSION" | "BITPIX" | "NAXIS" | "PCOUNT" | "GCOUNT" | "GROUPS" | "ZIMAGE"
        | "END" => true,
        _ => name
            .strip_prefix("NAXIS")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
    }
}

impl Drop for FitsFile {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!(name = %self.name, error = %err, "failed to flush FITS file on drop");
        }
    }
}

impl NewFitsFile {
    /// Replace the file if it already exists.
    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Write an empty primary HDU and return a read-write handle on it.
    pub fn open(self) -> Result<FitsFile> {
        if !self.overwrite && self.path.exists() {
            return Err(Error::FileExists(self.path));
        }

        let cards = vec![
            Card::new("SIMPLE", Some(Value::Logical(true)), Some("conforms to FITS standard"))?,
            Card::new("BITPIX", Some(Value::Integer(8)), Some("array data type"))?,
            Card::new("NAXIS", Some(Value::Integer(0)), Some("number of array dimensions"))?,
            Card::new("EXTEND", Some(Value::Logical(true)), None)?,
        ];
        let data = serialize_header(&cards);
        fs::write(&self.path, &data).map_err(|source| Error::FileNotCreated {
            path: self.path.clone(),
            source,
        })?;
        let hdus = scan_hdus(&data)?;
        debug!(path = %self.path.display(), "created FITS file");

        Ok(FitsFile {
            data,
            name: self.path.to_string_lossy().into_owned(),
            path: Some(self.path),
            url_type: FILE_URL,
            mode: OpenMode::ReadWrite,
            hdus,
            current: 0,
            dirty: false,
        })
    }
}
