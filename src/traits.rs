//! Traits for format-agnostic parsing and serialization.

use std::{
    fs::File,
    io::{BufRead, BufReader, Cursor, Write},
    path::Path,
};

use crate::{atomic, error::Error};

/// A trait for parsing and writing one format's on-disk document from/to
/// one file.
///
/// `write_to` is atomic: the document is serialized to memory first, then
/// written via temp-file-and-rename.
pub trait Parser {
    /// Parse from any reader.
    fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Parse from a file path. Maps a missing file to [`Error::NotFound`].
    fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(path.display())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Write to any writer (file, memory, etc.).
    fn to_writer<W: Write>(&self, writer: W) -> Result<(), Error>;

    /// Write to a file path atomically, creating parent directories.
    fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let mut buffer = Vec::new();
        self.to_writer(&mut buffer)?;
        atomic::write_atomic(path.as_ref(), &buffer)
    }

    /// Parse from a string.
    fn from_str(s: &str) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(s))
    }

    /// Parse from bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        Self::from_reader(Cursor::new(bytes))
    }
}
