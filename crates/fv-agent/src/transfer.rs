//! File transfer streamer
//!
//! Streams one file, or one directory packed as a zip archive, over a
//! dedicated side channel: first the total byte count as a text
//! frame, then binary chunks of at most 1 MiB until the count is
//! reached. Directory archives are built fully in memory before the
//! size prefix goes out, so memory use scales with the compressed
//! archive size. Errors abort the transfer and close the channel; no
//! automatic retry.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use fv_core::{paths, ChannelId, ChannelOpener, TransportTx};
use fv_protocol::CHUNK_SIZE;

/// Handle one `download` request end to end: open the side channel
/// tagged with the request id, stream the target, close the channel.
/// Runs as its own task; failures are logged, never fatal to the
/// control loop.
pub async fn run_download(
    opener: Arc<dyn ChannelOpener>,
    base: PathBuf,
    request_id: String,
    url: String,
) {
    let path = paths::resolve_virtual(&base, &url);
    let correlation = ChannelId::new(request_id.clone());

    let channel = match opener.open(&correlation).await {
        Ok(channel) => channel,
        Err(e) => {
            tracing::warn!("Download {}: channel open failed: {}", request_id, e);
            return;
        }
    };
    let (mut tx, _rx) = channel.split();

    match stream_path(tx.as_mut(), &path).await {
        Ok(sent) => tracing::info!("Download {}: sent {} bytes from {:?}", request_id, sent, path),
        Err(e) => tracing::warn!("Download {}: aborted: {:#}", request_id, e),
    }

    if let Err(e) = tx.close().await {
        tracing::debug!("Download {}: close failed: {}", request_id, e);
    }
}

/// Stream a file or directory over an already-open side channel.
/// Returns the number of payload bytes sent.
pub async fn stream_path(tx: &mut dyn TransportTx, path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("stat {:?}", path))?;

    if metadata.is_file() {
        stream_file(tx, path, metadata.len()).await
    } else if metadata.is_dir() {
        stream_directory(tx, path).await
    } else {
        bail!("{:?} is neither a file nor a directory", path);
    }
}

/// File mode: size prefix, then the raw bytes in order.
async fn stream_file(tx: &mut dyn TransportTx, path: &Path, size: u64) -> Result<u64> {
    tx.send_text(&size.to_string()).await?;

    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("open {:?}", path))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        tx.send_binary(Bytes::copy_from_slice(&buf[..n])).await?;
        sent += n as u64;
    }

    Ok(sent)
}

/// Directory mode: pack the tree into a zip archive, then stream it
/// exactly like a file. Packing runs off-loop.
async fn stream_directory(tx: &mut dyn TransportTx, path: &Path) -> Result<u64> {
    let root = path.to_path_buf();
    let archive = tokio::task::spawn_blocking(move || build_archive(&root))
        .await
        .context("archive task panicked")??;

    tx.send_text(&archive.len().to_string()).await?;

    let total = archive.len() as u64;
    let bytes = Bytes::from(archive);
    let mut offset = 0;
    while offset < bytes.len() {
        let end = (offset + CHUNK_SIZE).min(bytes.len());
        tx.send_binary(bytes.slice(offset..end)).await?;
        offset = end;
    }

    Ok(total)
}

/// Pack a directory tree into an in-memory deflate zip archive, paths
/// stored relative to the directory root.
fn build_archive(root: &Path) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(root) {
        let entry = entry.with_context(|| format!("walk {:?}", root))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .context("entry outside archive root")?;
        let name = relative.to_string_lossy().replace('\\', "/");

        writer.start_file(name, options)?;
        let mut file =
            std::fs::File::open(entry.path()).with_context(|| format!("open {:?}", entry.path()))?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n])?;
        }
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem;
    use fv_core::Payload;

    async fn drain(rx: &mut dyn fv_core::TransportRx) -> Vec<Payload> {
        let mut frames = Vec::new();
        while let Ok(Some(payload)) = rx.recv().await {
            frames.push(payload);
        }
        frames
    }

    #[tokio::test]
    async fn test_empty_file_sends_size_zero_and_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();

        let (mut ours, mut theirs) = mem::pair();
        let sent = stream_path(ours.tx.as_mut(), &path).await.unwrap();
        assert_eq!(sent, 0);
        ours.tx.close().await.unwrap();

        let frames = drain(theirs.rx.as_mut()).await;
        assert_eq!(frames, vec![Payload::Text("0".to_string())]);
    }

    #[tokio::test]
    async fn test_file_streams_size_then_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let (mut ours, mut theirs) = mem::pair();
        let sent = stream_path(ours.tx.as_mut(), &path).await.unwrap();
        assert_eq!(sent, 11);
        ours.tx.close().await.unwrap();

        let frames = drain(theirs.rx.as_mut()).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Payload::Text("11".to_string()));
        assert_eq!(
            frames[1],
            Payload::Binary(Bytes::from_static(b"hello world"))
        );
    }

    #[tokio::test]
    async fn test_directory_streams_readable_archive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        std::fs::write(dir.path().join("nested/b.txt"), b"beta").unwrap();

        let (mut ours, mut theirs) = mem::pair();
        let sent = stream_path(ours.tx.as_mut(), dir.path()).await.unwrap();
        ours.tx.close().await.unwrap();

        let frames = drain(theirs.rx.as_mut()).await;
        let declared: u64 = match &frames[0] {
            Payload::Text(size) => size.parse().unwrap(),
            other => panic!("Expected size prefix, got {:?}", other),
        };

        let mut body = Vec::new();
        for frame in &frames[1..] {
            match frame {
                Payload::Binary(chunk) => {
                    assert!(chunk.len() <= CHUNK_SIZE);
                    body.extend_from_slice(chunk);
                }
                other => panic!("Expected binary chunk, got {:?}", other),
            }
        }
        assert_eq!(declared, body.len() as u64);
        assert_eq!(declared, sent);

        let mut archive = zip::ZipArchive::new(Cursor::new(body)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "nested/b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_path_aborts_before_size_prefix() {
        let dir = tempfile::tempdir().unwrap();

        let (mut ours, mut theirs) = mem::pair();
        assert!(stream_path(ours.tx.as_mut(), &dir.path().join("nope"))
            .await
            .is_err());
        ours.tx.close().await.unwrap();

        assert!(drain(theirs.rx.as_mut()).await.is_empty());
    }
}
