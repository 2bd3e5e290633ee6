//! Binary (bincode) file helpers.

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Reads a bincode-encoded value from a file.
pub fn read_binary<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> anyhow::Result<T> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = bincode::deserialize_from(BufReader::new(file))
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

/// Writes a value to a file, bincode-encoded.
pub fn write_binary<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> anyhow::Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    bincode::serialize_into(BufWriter::new(file), value).with_context(|| format!("encoding {}", path.display()))?;
    Ok(())
}
