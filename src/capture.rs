//! Raw block capture in CS16 format
//!
//! CS16 is interleaved little-endian `i16` pairs, I then Q, with no header.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use num_complex::Complex;

use crate::config::{CaptureConfig, CaptureMode};
use crate::constants::CS16_BYTES_PER_SAMPLE;
use crate::error::Result;

/// Destination for raw sample blocks
pub trait CaptureSink {
    fn write(&mut self, block: &[Complex<i16>]) -> Result<()>;
}

/// Writes blocks to a CS16 file
pub struct Cs16FileSink {
    path: PathBuf,
    mode: CaptureMode,
    append_writer: Option<BufWriter<File>>,
}

impl Cs16FileSink {
    /// Create a sink for `path`
    ///
    /// In `Append` mode the file is truncated once here and every block is
    /// appended; in `Latest` mode nothing is touched until the first write.
    pub fn new<P: AsRef<Path>>(path: P, mode: CaptureMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let append_writer = match mode {
            CaptureMode::Append => Some(BufWriter::new(File::create(&path)?)),
            CaptureMode::Latest => None,
        };

        Ok(Self {
            path,
            mode,
            append_writer,
        })
    }

    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        Self::new(&config.path, config.mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }
}

impl CaptureSink for Cs16FileSink {
    fn write(&mut self, block: &[Complex<i16>]) -> Result<()> {
        match self.append_writer.as_mut() {
            Some(writer) => {
                write_cs16(writer, block)?;
                writer.flush()?;
            }
            None => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&self.path)?;
                let mut writer = BufWriter::new(file);
                write_cs16(&mut writer, block)?;
                writer.flush()?;
            }
        }
        Ok(())
    }
}

impl CaptureSink for Vec<Vec<Complex<i16>>> {
    fn write(&mut self, block: &[Complex<i16>]) -> Result<()> {
        self.push(block.to_vec());
        Ok(())
    }
}

/// Serialize samples as CS16
pub fn write_cs16<W: Write>(writer: &mut W, samples: &[Complex<i16>]) -> std::io::Result<()> {
    for sample in samples {
        writer.write_all(&sample.re.to_le_bytes())?;
        writer.write_all(&sample.im.to_le_bytes())?;
    }
    Ok(())
}

/// Decode CS16 bytes; a trailing partial sample is ignored
pub fn decode_cs16(bytes: &[u8]) -> Vec<Complex<i16>> {
    bytes
        .chunks_exact(CS16_BYTES_PER_SAMPLE)
        .map(|c| {
            Complex::new(
                i16::from_le_bytes([c[0], c[1]]),
                i16::from_le_bytes([c[2], c[3]]),
            )
        })
        .collect()
}

/// Load a whole CS16 file
pub fn read_cs16<P: AsRef<Path>>(path: P) -> Result<Vec<Complex<i16>>> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    if bytes.len() % CS16_BYTES_PER_SAMPLE != 0 {
        log::warn!(
            "CS16 data has {} trailing bytes, ignoring",
            bytes.len() % CS16_BYTES_PER_SAMPLE
        );
    }
    Ok(decode_cs16(&bytes))
}
