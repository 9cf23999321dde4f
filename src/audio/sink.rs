//! Opening `file://` uris as `rodio` sources.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use rodio::{Decoder, Source};

use crate::error::BackendError;

pub(super) type FileSource = Decoder<BufReader<File>>;

/// Turn a percent-encoded `file://` uri back into a filesystem path.
pub(super) fn uri_to_path(uri: &str) -> Result<PathBuf, BackendError> {
    let raw = uri
        .strip_prefix("file://")
        .ok_or_else(|| BackendError::UnsupportedUri(uri.to_string()))?;
    let decoded =
        urlencoding::decode(raw).map_err(|_| BackendError::UnsupportedUri(uri.to_string()))?;
    Ok(PathBuf::from(decoded.into_owned()))
}

/// Open and decode `uri`, returning the source and its length when known.
pub(super) fn open_source(uri: &str) -> Result<(FileSource, Option<Duration>), BackendError> {
    let path = uri_to_path(uri)?;
    let file = File::open(&path).map_err(|source| BackendError::Open {
        path: path.clone(),
        source,
    })?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| BackendError::Decode {
        path,
        message: e.to_string(),
    })?;
    let duration = source.total_duration();
    Ok((source, duration))
}
