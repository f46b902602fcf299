//! Chunked file transfer over a data channel.
//!
//! A file is a `file-metadata` text frame, zero or more binary chunks of at
//! most [`CHUNK_SIZE`] bytes, and a `file-end` text frame. Frames are sent
//! fire-and-forget; the channel is ordered and reliable.

use crate::domain::{FileMetadata, OutgoingFile, ReceivedFile};
use crate::infrastructure::error::{P2PError, Result, TransferError};
use crate::infrastructure::transport::{DataChannel, Frame};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const CHUNK_SIZE: usize = 16 * 1024;

/// Text frames of the transfer protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlFrame {
    FileMetadata(FileMetadata),
    FileEnd,
}

impl ControlFrame {
    fn to_frame(&self) -> Result<Frame> {
        Ok(Frame::Text(serde_json::to_string(self)?))
    }

    /// Decode a text frame, telling malformed frames from unknown types
    pub fn parse(text: &str) -> std::result::Result<Self, TransferError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| TransferError::MalformedFrame(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TransferError::MalformedFrame("missing `type`".to_string()))?;
        if kind != "file-metadata" && kind != "file-end" {
            return Err(TransferError::UnknownFrame(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| TransferError::MalformedFrame(e.to_string()))
    }
}

/// Number of binary frames a file of `len` bytes is split into
pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(CHUNK_SIZE)
}

/// Send metadata, chunks and terminator over an open channel
#[instrument(skip_all, fields(name = %file.name, size = file.data.len()))]
pub fn send_file(channel: &mut dyn DataChannel, file: &OutgoingFile) -> Result<()> {
    if !channel.is_open() {
        return Err(P2PError::ChannelNotReady);
    }

    channel.send(ControlFrame::FileMetadata(file.metadata()).to_frame()?)?;
    for chunk in file.data.chunks(CHUNK_SIZE) {
        channel.send(Frame::Binary(chunk.to_vec()))?;
    }
    channel.send(ControlFrame::FileEnd.to_frame()?)?;

    info!(chunks = chunk_count(file.data.len()), "File sent");
    Ok(())
}

/// Receiving half of the transfer protocol
#[derive(Debug, Default)]
pub struct FileReceiver {
    pending: Option<FileMetadata>,
    chunks: Vec<Vec<u8>>,
}

impl FileReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of the file currently being received
    pub fn pending(&self) -> Option<&FileMetadata> {
        self.pending.as_ref()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Feed one frame; yields the file once its terminator arrives
    pub fn on_frame(
        &mut self,
        frame: Frame,
    ) -> std::result::Result<Option<ReceivedFile>, TransferError> {
        match frame {
            Frame::Binary(chunk) => {
                if self.pending.is_none() {
                    return Err(TransferError::ChunkWithoutMetadata { len: chunk.len() });
                }
                self.chunks.push(chunk);
                Ok(None)
            }
            Frame::Text(text) => match ControlFrame::parse(&text)? {
                ControlFrame::FileMetadata(metadata) => {
                    if let Some(previous) = &self.pending {
                        warn!(name = %previous.name, "Abandoning incomplete file");
                    }
                    debug!(name = %metadata.name, size = metadata.size, "Receiving file");
                    self.pending = Some(metadata);
                    self.chunks.clear();
                    Ok(None)
                }
                ControlFrame::FileEnd => {
                    let metadata = self
                        .pending
                        .take()
                        .ok_or(TransferError::EndWithoutMetadata)?;
                    let data = std::mem::take(&mut self.chunks).concat();

                    if data.len() as u64 != metadata.size {
                        warn!(
                            name = %metadata.name,
                            announced = metadata.size,
                            received = data.len(),
                            "Received size differs from announced size"
                        );
                    }
                    info!(name = %metadata.name, size = data.len(), "File received");

                    Ok(Some(ReceivedFile {
                        name: metadata.name,
                        mime_type: metadata.mime_type,
                        data,
                    }))
                }
            },
        }
    }
}
