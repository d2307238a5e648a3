//! Scene batch engine: IO building blocks used by the host.
mod codec;
mod download;
mod persist;
mod protocol;
mod types;

pub use codec::{
    decode_message, encode_frame, read_frame, write_frame, CodecError, MAX_INBOUND_FRAME,
    MAX_OUTBOUND_FRAME,
};
pub use download::{fetchable_by_host, DownloadSettings, Downloader, HttpDownloader};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use protocol::{
    Inbound, Outbound, WirePendingDownload, WirePrompt, WireRunMode, WireSettings, WireStats,
    WireStatus, WireSubmission, WireWorkflowState,
};
pub use types::{DownloadError, DownloadRequest, FailureKind, SavedFile};
