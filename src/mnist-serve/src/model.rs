use std::path::Path;

use tch::{CModule, Device, Tensor};

use crate::error::Result;

/// A loaded computation graph: given an input tensor, produce the class
/// scores.
pub trait Model: Send {
    fn forward(&self, input: &Tensor) -> Result<Tensor>;
}

/// Turns a model artifact on disk into a [`Model`] living on `device`.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path, device: Device) -> Result<Box<dyn Model>>;
}

impl Model for CModule {
    fn forward(&self, input: &Tensor) -> Result<Tensor> {
        Ok(self.forward_ts(&[input])?)
    }
}

/// Loads TorchScript archives (written with `torch.jit.save`) through
/// libtorch.
#[derive(Clone, Copy, Debug, Default)]
pub struct TorchScript;

impl ModelLoader for TorchScript {
    fn load(&self, path: &Path, device: Device) -> Result<Box<dyn Model>> {
        let mut module = CModule::load_on_device(path, device)?;
        module.set_eval();

        Ok(Box::new(module))
    }
}
