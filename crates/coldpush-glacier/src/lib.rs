//! Amazon S3 Glacier adapter for coldpush.
//!
//! [`GlacierArchiveService`] implements
//! [`ArchiveService`](coldpush_upload::ArchiveService) on top of
//! `aws-sdk-glacier`, translating the SDK's error codes into the
//! [`ServiceError`](coldpush_upload::ServiceError) classes the upload driver
//! reasons about.

mod error;
mod service;

pub use service::GlacierArchiveService;
