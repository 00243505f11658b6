//! Console output handler.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::Output;
use crate::derive::DerivedKey;
use crate::evaluate::Hit;

/// Console output - prints to stdout or a file.
pub struct ConsoleOutput {
    writer: Mutex<Box<dyn Write + Send>>,
    verbose: bool,
}

impl ConsoleOutput {
    /// Create console output to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()), false)
    }

    /// Create verbose console output.
    pub fn verbose() -> Self {
        Self::with_writer(Box::new(io::stdout()), true)
    }

    pub fn to_file(path: &Path) -> Result<Self> {
        Ok(Self::with_writer(Box::new(create(path)?), false))
    }

    pub fn to_file_verbose(path: &Path) -> Result<Self> {
        Ok(Self::with_writer(Box::new(create(path)?), true))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>, verbose: bool) -> Self {
        Self {
            writer: Mutex::new(writer),
            verbose,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Write + Send>>> {
        self.writer.lock().map_err(|_| anyhow!("output writer poisoned"))
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for ConsoleOutput {
    fn key(&self, derived: &DerivedKey) -> Result<()> {
        let mut w = self.lock()?;

        if self.verbose {
            writeln!(w, "---")?;
            writeln!(w, "candidate: {}", derived.candidate)?;
            if derived.reduced {
                writeln!(w, "derived_from: {}", derived.private_key_hex)?;
            }
            writeln!(w, "wif_compressed: {}", derived.wif_compressed)?;
            writeln!(w, "wif_uncompressed: {}", derived.wif_uncompressed)?;
            writeln!(w, "hash160_compressed: {}", derived.hash160_compressed)?;
            writeln!(w, "p2pkh_compressed: {}", derived.p2pkh_compressed)?;
            writeln!(w, "p2pkh_uncompressed: {}", derived.p2pkh_uncompressed)?;
            writeln!(w, "p2wpkh: {}", derived.p2wpkh)?;
        } else {
            // Compact format: candidate,address_compressed
            writeln!(w, "{},{}", derived.candidate, derived.p2pkh_compressed)?;
        }

        Ok(())
    }

    fn hit(&self, hit: &Hit) -> Result<()> {
        let mut w = self.lock()?;
        let derived = &hit.derived;

        writeln!(w, "\n========== HIT ==========")?;
        writeln!(w, "Index: {}", hit.index)?;
        writeln!(w, "Matched: {} ({})", hit.info.address, hit.info.address_type.as_str())?;
        writeln!(w, "---")?;
        writeln!(w, "Private Key: {}", hit.key)?;
        if derived.reduced {
            writeln!(w, "Derived From: {}", derived.private_key_hex)?;
        }
        writeln!(w, "WIF (compressed): {}", derived.wif_compressed)?;
        writeln!(w, "WIF (uncompressed): {}", derived.wif_uncompressed)?;
        writeln!(w, "---")?;
        writeln!(w, "P2PKH (compressed): {}", derived.p2pkh_compressed)?;
        writeln!(w, "P2PKH (uncompressed): {}", derived.p2pkh_uncompressed)?;
        writeln!(w, "P2WPKH: {}", derived.p2wpkh)?;
        writeln!(w, "HASH160 (compressed): {}", derived.hash160_compressed)?;
        writeln!(w, "HASH160 (uncompressed): {}", derived.hash160_uncompressed)?;
        writeln!(w, "=========================")?;

        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.lock()?.flush()?;
        Ok(())
    }
}
