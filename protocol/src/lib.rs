mod credentials;
pub mod util;
mod work_item;

pub use crate::{
    credentials::Password,
    work_item::{Attributes, Content, WorkItem},
};

/// Attribute holding the name of the incoming file.
pub const FILENAME_ATTRIBUTE: &str = "filename";

/// Attribute written on delivered items: the file name of the generated archive.
pub const ZIP_FILENAME_ATTRIBUTE: &str = "zip.filename";

/// Effective file name when the `filename` attribute is absent or empty.
pub const DEFAULT_FILENAME: &str = "inputfile";
