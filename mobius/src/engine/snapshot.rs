//! Checksummed keyspace images, used for snapshots and dumps.
//!
//! ```text
//! +----------+---------+-------------+-----------+--------------------+
//! | MBSNAP01 | version | payload len | crc32     | bincode(image)     |
//! | 8 bytes  | u32 LE  | u64 LE      | u32 LE    | payload len bytes  |
//! +----------+---------+-------------+-----------+--------------------+
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crc32fast::Hasher as Crc32;
use tracing::debug;

use super::EngineResult;
use super::keyspace::KeyspaceImage;
use crate::error::EngineError;

const SNAPSHOT_MAGIC: &[u8; 8] = b"MBSNAP01";
const SNAPSHOT_VERSION: u32 = 1;

/// Name of the snapshot file inside an engine directory.
pub(crate) const SNAPSHOT_FILE: &str = "snapshot.bin";
pub(crate) const SNAPSHOT_TMP_FILE: &str = ".snapshot.bin.tmp";

/// Writes `image` to `sink` with header and checksum. `target` names the
/// sink in errors.
pub(crate) fn write_image(
    sink: &mut dyn Write,
    image: &KeyspaceImage,
    target: &str,
) -> EngineResult<()> {
    let payload = bincode::serialize(image)?;
    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let write = |sink: &mut dyn Write| -> std::io::Result<()> {
        sink.write_all(SNAPSHOT_MAGIC)?;
        sink.write_all(&SNAPSHOT_VERSION.to_le_bytes())?;
        sink.write_all(&(payload.len() as u64).to_le_bytes())?;
        sink.write_all(&crc.to_le_bytes())?;
        sink.write_all(&payload)?;
        sink.flush()
    };
    write(sink).map_err(|source| EngineError::Io {
        path: target.to_string(),
        source,
    })
}

/// Reads and validates an image written by [`write_image`].
///
/// `what` names the source in errors ("snapshot" or "dump").
pub(crate) fn read_image(source: &mut dyn Read, what: &'static str) -> EngineResult<KeyspaceImage> {
    let corrupted = |reason: String| EngineError::Corrupted { what, reason };
    let truncated = |e: std::io::Error| corrupted(format!("truncated header: {e}"));

    let mut magic = [0u8; 8];
    source.read_exact(&mut magic).map_err(truncated)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(corrupted("bad magic".to_string()));
    }

    let mut b4 = [0u8; 4];
    source.read_exact(&mut b4).map_err(truncated)?;
    let version = u32::from_le_bytes(b4);
    if version != SNAPSHOT_VERSION {
        return Err(corrupted(format!("unsupported version {version}")));
    }

    let mut b8 = [0u8; 8];
    source.read_exact(&mut b8).map_err(truncated)?;
    let payload_len = usize::try_from(u64::from_le_bytes(b8))
        .map_err(|_| corrupted("payload length overflows".to_string()))?;

    source.read_exact(&mut b4).map_err(truncated)?;
    let expected_crc = u32::from_le_bytes(b4);

    let mut payload = Vec::new();
    (&mut *source)
        .take(payload_len as u64)
        .read_to_end(&mut payload)
        .map_err(|e| corrupted(format!("unreadable payload: {e}")))?;
    if payload.len() != payload_len {
        return Err(corrupted(format!(
            "payload truncated: expected {payload_len} bytes, found {}",
            payload.len()
        )));
    }

    let mut hasher = Crc32::new();
    hasher.update(&payload);
    if hasher.finalize() != expected_crc {
        return Err(corrupted("checksum mismatch".to_string()));
    }

    bincode::deserialize(&payload).map_err(|e| corrupted(format!("undecodable payload: {e}")))
}

/// Loads the snapshot in `dir`, if there is one.
pub(crate) fn load(dir: &Path) -> EngineResult<Option<KeyspaceImage>> {
    let path = dir.join(SNAPSHOT_FILE);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(EngineError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };

    let image = read_image(&mut BufReader::new(file), "snapshot")?;
    debug!(path = %path.display(), "snapshot loaded");
    Ok(Some(image))
}

/// Atomically replaces the snapshot in `dir`: write to a temp file, fsync,
/// rename, fsync the directory.
pub(crate) fn install(dir: &Path, image: &KeyspaceImage) -> EngineResult<()> {
    let tmp_path = dir.join(SNAPSHOT_TMP_FILE);
    let final_path = dir.join(SNAPSHOT_FILE);
    let io_error = |path: &Path, source: std::io::Error| EngineError::Io {
        path: path.display().to_string(),
        source,
    };

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)
        .map_err(|e| io_error(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    write_image(&mut writer, image, &tmp_path.display().to_string())?;
    writer
        .get_ref()
        .sync_data()
        .map_err(|e| io_error(&tmp_path, e))?;
    drop(writer);

    fs::rename(&tmp_path, &final_path).map_err(|e| io_error(&final_path, e))?;
    File::open(dir)
        .and_then(|d| d.sync_data())
        .map_err(|e| io_error(dir, e))?;

    debug!(path = %final_path.display(), "snapshot installed");
    Ok(())
}
