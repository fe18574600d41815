//! Generation orchestration

pub mod coordinator;

pub use coordinator::{
    GenerateError, GenerationCoordinator, PendingUpload, RegenerateParams, UploadGateway,
};
