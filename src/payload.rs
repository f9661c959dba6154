//! Byte stream owned by a task and handed to the uploader

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Content a task uploads: an in-memory buffer or an open file
///
/// A payload has exactly one owner at a time. Stages replace it wholesale
/// (e.g. after an external program rewrites the file) and the task drops it
/// when it finishes.
#[derive(Debug)]
pub struct Payload {
    source: Source,
}

#[derive(Debug)]
enum Source {
    Memory(Cursor<Vec<u8>>),
    File { path: PathBuf, file: File },
}

impl Payload {
    /// Wrap an in-memory buffer
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: Source::Memory(Cursor::new(bytes)),
        }
    }

    /// UTF-8 encode text into an in-memory buffer
    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }

    /// Open a file for reading
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            source: Source::File {
                path: path.to_path_buf(),
                file,
            },
        })
    }

    /// Total length in bytes
    pub fn len(&self) -> io::Result<u64> {
        match &self.source {
            Source::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Source::File { file, .. } => Ok(file.metadata()?.len()),
        }
    }

    /// Whether the payload has no bytes
    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The backing file, for file payloads
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::Memory(_) => None,
            Source::File { path, .. } => Some(path),
        }
    }

    /// Seek back to the first byte
    pub fn rewind(&mut self) -> io::Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Read everything from the current position
    pub fn read_remaining(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Payload {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Memory(cursor) => cursor.read(buf),
            Source::File { file, .. } => file.read(buf),
        }
    }
}

impl Seek for Payload {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.source {
            Source::Memory(cursor) => cursor.seek(pos),
            Source::File { file, .. } => file.seek(pos),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn text_payload_decodes_to_original() {
        let mut payload = Payload::from_text("hello");
        assert_eq!(payload.len().unwrap(), 5);
        let bytes = payload.read_remaining().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "hello");
    }

    #[test]
    fn rewind_allows_rereading() {
        let mut payload = Payload::from_bytes(vec![1, 2, 3]);
        assert_eq!(payload.read_remaining().unwrap(), vec![1, 2, 3]);
        assert!(payload.read_remaining().unwrap().is_empty());
        payload.rewind().unwrap();
        assert_eq!(payload.read_remaining().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn file_payload_reports_path_and_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"abcdef")
            .unwrap();

        let mut payload = Payload::open(&path).unwrap();
        assert_eq!(payload.path(), Some(path.as_path()));
        assert_eq!(payload.len().unwrap(), 6);
        assert!(!payload.is_empty().unwrap());
        assert_eq!(payload.read_remaining().unwrap(), b"abcdef");
    }

    #[test]
    fn opening_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Payload::open(&dir.path().join("missing")).is_err());
    }
}
