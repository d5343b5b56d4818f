//! Downloading and decoding registry snapshots.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use tracing::debug;
use ureq::http::{header::ACCEPT, StatusCode};
use url::Url;

use crate::{
    error::{ErrorContext, RegistryError, Result},
    http_client,
    snapshot::Snapshot,
};

/// Fetches the full registry index from `url`.
///
/// The response body is streamed straight into the JSON decoder, so the
/// listing never has to fit into a single buffer first.
///
/// # Errors
///
/// Returns [`RegistryError`] if:
/// - `url` is not a valid URL
/// - the request fails or the server answers with anything but `200 OK`
/// - the body is not a valid index listing
pub fn fetch_snapshot(url: &str) -> Result<Snapshot> {
    Url::parse(url).map_err(|err| RegistryError::InvalidUrl(format!("{url}: {err}")))?;

    debug!("fetching registry snapshot from {}", url);

    let resp = http_client::get(url)
        .header(ACCEPT, "application/json")
        .call()
        .map_err(|err| {
            match err {
                ureq::Error::StatusCode(code) => {
                    RegistryError::FailedToFetchRemote(format!("{url} [{code}]"))
                }
                other => RegistryError::UreqError(other),
            }
        })?;

    if resp.status() != StatusCode::OK {
        return Err(RegistryError::FailedToFetchRemote(format!(
            "{} [{}]",
            url,
            resp.status()
        )));
    }

    let snapshot = decode_snapshot(BufReader::new(resp.into_body().into_reader()))?;

    debug!(
        rows = snapshot.len(),
        total_rows = snapshot.total_rows,
        "decoded registry snapshot"
    );

    Ok(snapshot)
}

/// Decodes a snapshot previously saved to disk.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("opening snapshot file {}", path.display()))?;
    decode_snapshot(BufReader::new(file))
}

fn decode_snapshot<R: Read>(reader: R) -> Result<Snapshot> {
    Ok(serde_json::from_reader(reader)?)
}
