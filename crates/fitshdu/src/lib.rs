//! Header Data Unit navigation for FITS files.
//!
//! A [`FitsFile`] holds a FITS file in memory together with a 1-based cursor
//! on one of its HDUs. The cursor can be moved by absolute number, by a
//! relative offset, or by EXTNAME/EXTVER, and the header of the current HDU
//! can be inspected, edited and written out as text.
//!
//! ```no_run
//! use fitshdu::{FitsFile, HduType, OpenMode};
//!
//! let mut f = FitsFile::open("obs.fits", OpenMode::ReadOnly)?;
//! f.mov_nam_hdu(Some(HduType::BinaryTable), "EVENTS", 0)?;
//! let rows: i64 = f.read_key("NAXIS2")?;
//! println!("{rows} rows");
//! f.write_hdu(&mut std::io::stdout())?;
//! # Ok::<(), fitshdu::Error>(())
//! ```

pub mod block;
pub mod error;
pub mod file;
pub mod header;
pub mod keys;
pub mod layout;
pub mod url;
pub mod value;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use error::{Error, Result};
pub use file::{FitsFile, NewFitsFile, OpenMode};
pub use header::Card;
pub use keys::{ReadsKey, WritesKey};
pub use layout::{Hdu, HduType};
pub use url::{FILE_URL, MEM_URL};
pub use value::Value;
