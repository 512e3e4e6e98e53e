//! Turns a single file's content into a password-protected, AES-encrypted ZIP archive.
//!
//! An invocation goes through three steps, all backed by temporary files in a
//! [`StagingArea`](staging::StagingArea):
//!
//! - the incoming content is copied byte-for-byte into a staged file;
//! - a single-entry archive is written next to it, with the entry encrypted
//!   using WinZip AES and the configured password;
//! - the archive is read back and becomes the content of the delivered item.
//!
//! Both temporary files are deleted before the result is returned, on success
//! and on failure alike. A failed invocation hands back the original item
//! untouched together with the error that stopped it.

pub mod archive;
pub mod processor;
pub mod staging;

pub use crate::{
    archive::{AesStrength, ArchiveName, EncryptionSpec},
    processor::{ArchiveResult, InvocationError, InvocationState, Processor},
    staging::StagingArea,
};
