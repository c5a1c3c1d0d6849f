//! Remote side of Zipgate: the Zipline client, status mapping, the listing
//! cache and the [`FileGate`] service that puts the staging gate in front
//! of them.

pub mod cache;
pub mod client;
pub mod service;
pub mod status;
pub mod store;

pub use cache::{generate_key, TtlCache};
pub use client::ZiplineClient;
pub use service::{validate_file_id, FileGate};
pub use status::map_status;
pub use store::{FilePage, ListQuery, RemoteFile, RemoteStore, UploadResponse, UploadedFile};
