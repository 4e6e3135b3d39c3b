use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use mescrow_core::identity::ADDRESS_LEN;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ClientError, Result};

/// Reads JSON-encoded input (config, transfer, key file) from the given `path`.
pub fn load_input_data<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!(
                "Input file {:?} not found.
                Create it by hand or with `mescrow-cli keygen`, or pass
                its path explicitly.",
                path
            );
        }
        Err(e) => return Err(e).context(format!("opening file {:?}", path)),
    };
    serde_json::from_reader(file).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Writes JSON-encoded `data` to the given `path`,
/// creating parent directories as needed.
pub fn save_output<P, T>(path: P, data: &T) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {:?}", parent))?;
    }

    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, data)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

/// Decodes a command-line argument into opaque bytes.
///
/// `0x`-prefixed strings and bare 64-char hex strings are read as hex,
/// anything else as base58.
pub fn parse_arg(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let decoded = if let Some(stripped) = s.strip_prefix("0x") {
        hex::decode(stripped).ok()
    } else if s.len() == ADDRESS_LEN * 2 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(s).ok()
    } else {
        bs58::decode(s).into_vec().ok()
    };
    decoded.ok_or_else(|| ClientError::InvalidArgument(s.to_string()))
}
