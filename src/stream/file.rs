use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Capability, Error, Result};

use super::{SeekOrigin, Stream};

/// How the file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Open or create, then position at the end. Needs write access.
    Append,
    /// Create, truncating any existing file.
    Create,
    /// Create, failing if the file already exists.
    CreateNew,
    /// Open an existing file.
    Open,
    /// Open the file if it exists, otherwise create it.
    OpenOrCreate,
    /// Open an existing file and truncate it to zero bytes.
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    ReadWrite,
}

impl FileAccess {
    fn readable(self) -> bool {
        matches!(self, FileAccess::Read | FileAccess::ReadWrite)
    }

    fn writable(self) -> bool {
        matches!(self, FileAccess::Write | FileAccess::ReadWrite)
    }
}

/// A stream over a file on disk.
#[derive(Debug)]
pub struct FileStream {
    file: Option<File>,
    path: PathBuf,
    position: u64,
    access: FileAccess,
}

impl FileStream {
    /// Opens with write-only access for `Append` and read/write otherwise.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<Self> {
        let access = match mode {
            FileMode::Append => FileAccess::Write,
            _ => FileAccess::ReadWrite,
        };
        Self::with_access(path, mode, access)
    }

    pub fn with_access(path: impl AsRef<Path>, mode: FileMode, access: FileAccess) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let creates = !matches!(mode, FileMode::Open);
        if creates && !access.writable() {
            return Err(Error::InvalidArgument(
                "file mode requires write access",
            ));
        }

        let mut options = OpenOptions::new();
        options.read(access.readable()).write(access.writable());
        match mode {
            FileMode::Append | FileMode::OpenOrCreate => {
                options.create(true);
            }
            FileMode::Create => {
                options.create(true).truncate(true);
            }
            FileMode::CreateNew => {
                options.create_new(true);
            }
            FileMode::Open => {}
            FileMode::Truncate => {
                options.truncate(true);
            }
        }

        let mut file = options.open(&path)?;
        let position = match mode {
            FileMode::Append => file.seek(SeekFrom::End(0))?,
            _ => 0,
        };

        Ok(FileStream {
            file: Some(file),
            path,
            position,
            access,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(Error::Closed)
    }
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !self.can_read() {
            return Err(Error::NotSupported(Capability::Read));
        }

        let file = self.file()?;
        let nread = loop {
            match file.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.position += nread as u64;
        Ok(nread)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if !self.can_write() {
            return Err(Error::NotSupported(Capability::Write));
        }

        self.file()?.write_all(buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn len(&self) -> Result<u64> {
        let file = self.file.as_ref().ok_or(Error::Closed)?;
        Ok(file.metadata()?.len())
    }

    fn set_len(&mut self, len: u64) -> Result<()> {
        if !self.can_write() {
            return Err(Error::NotSupported(Capability::Write));
        }

        self.file()?.set_len(len)?;
        if self.position > len {
            self.position = self.file()?.seek(SeekFrom::Start(len))?;
        }
        Ok(())
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let base = match origin {
            SeekOrigin::Begin => 0,
            SeekOrigin::Current => self.position as i128,
            SeekOrigin::End => self.len()? as i128,
        };
        let target = base + offset as i128;
        if target < 0 {
            return Err(Error::InvalidArgument("seek before start of stream"));
        }

        self.position = self.file()?.seek(SeekFrom::Start(target as u64))?;
        Ok(self.position)
    }

    fn can_read(&self) -> bool {
        self.file.is_some() && self.access.readable()
    }

    fn can_seek(&self) -> bool {
        self.file.is_some()
    }

    fn can_write(&self) -> bool {
        self.file.is_some() && self.access.writable()
    }

    fn flush(&mut self) -> Result<()> {
        self.file()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}
