//! Upload pipeline and its collaborators

pub mod feature_extractor;
pub mod media_store;
pub mod staging;
pub mod upload_pipeline;

pub use feature_extractor::{AudioFeatures, ExtractionError, MoodClassifier, ScriptExtractor};
pub use media_store::{ImageKitCredentials, ImageKitStore, MediaStore, StorageError, StoredMedia};
pub use staging::{StagedFile, StagingArea};
pub use upload_pipeline::{UploadError, UploadOutcome, UploadPipeline, UploadRequest};
