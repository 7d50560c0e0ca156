//! Image handling: MIME detection, upload decoding, the on-disk library and
//! the slot-aware resolver that feeds images to the UI.

pub mod library;
pub mod mime;
pub mod resolver;
pub mod upload;

pub use library::{ImageLibrary, StoredImage};
pub use mime::{data_uri, mime_for_path};
pub use resolver::{AssetEvent, AssetResolver, AssetSlot, AssetState, EncodedAsset, Resolution};
pub use upload::{decode_upload, DecodedUpload};
