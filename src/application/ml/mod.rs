pub mod adapter;
pub mod registry;
pub mod tabular_adapter;
pub mod windowed_adapter;

pub use adapter::{AdapterSpec, ModelAdapter, ModelHandle, ModelSource};
pub use registry::{LoadMetadata, ModelRegistry, ModelStatus, ModelsStatus, ReadyModels};
