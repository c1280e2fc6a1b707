pub mod loader;
pub mod onnx_runtime;
pub mod tree_ensemble;

pub use loader::FileModelLoader;
pub use onnx_runtime::OnnxRuntime;
pub use tree_ensemble::TreeEnsemble;
