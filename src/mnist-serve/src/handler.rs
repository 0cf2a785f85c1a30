use std::sync::Mutex;

use log::debug;
use once_cell::sync::OnceCell;
use tch::{Device, Tensor};

use crate::context::Context;
use crate::device::select_device;
use crate::error::{Error, Result};
use crate::model::{Model, ModelLoader, TorchScript};
use crate::payload::{ImagePayload, RequestItem};
use crate::tensor::tensor_from_json;
use crate::Timer;

struct Loaded {
    model: Mutex<Box<dyn Model>>,
    device: Device,
}

/// Takes a greyscale image and returns the digit in that image.
///
/// The model is loaded once, on the first call to [`Handler::initialize`]
/// or [`Handler::handle`], and kept for the lifetime of the handler.
pub struct Handler {
    loader: Box<dyn ModelLoader>,
    state: OnceCell<Loaded>,
}

impl Default for Handler {
    fn default() -> Self {
        Handler::new()
    }
}

impl Handler {
    /// Handler loading TorchScript archives.
    pub fn new() -> Self {
        Handler::with_loader(TorchScript)
    }

    pub fn with_loader<L: ModelLoader + 'static>(loader: L) -> Self {
        Handler {
            loader: Box::new(loader),
            state: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Device the model was placed on, once loaded.
    pub fn device(&self) -> Option<Device> {
        self.state.get().map(|loaded| loaded.device)
    }

    /// Load `<model_dir>/model.pth` onto the selected device. Later calls do
    /// nothing.
    pub fn initialize(&self, ctx: &Context) -> Result<()> {
        self.state.get_or_try_init(|| self.load(ctx))?;
        Ok(())
    }

    fn load(&self, ctx: &Context) -> Result<Loaded> {
        let device = select_device(ctx.system_properties.gpu_id);
        let model_path = ctx.model_path();

        let mut t = Timer::new_start("Loading model");
        let model = self.loader.load(&model_path, device)?;
        t.stop();

        debug!("Model file {} loaded successfully", model_path.display());

        Ok(Loaded {
            model: Mutex::new(model),
            device,
        })
    }

    /// Decode the first request item into an image tensor.
    pub fn preprocess(&self, data: &[RequestItem]) -> Result<Tensor> {
        let item = data.first().ok_or(Error::EmptyBatch)?;
        let raw = item.payload().ok_or(Error::MissingPayload)?;

        let payload = ImagePayload::from_bytes(raw)?;
        tensor_from_json(&payload.data)
    }

    /// Predict the class of an image tensor.
    pub fn inference(&self, input: &Tensor) -> Result<Vec<String>> {
        let loaded = self.state.get().ok_or(Error::NotInitialized)?;
        let model = loaded.model.lock().map_err(|_| Error::Poisoned)?;

        let mut t = Timer::new_start("Running forward pass");
        let inputs = input.to_device(loaded.device);
        let outputs = tch::no_grad(|| model.forward(&inputs))?;
        t.stop();

        let y_hat = outputs.f_argmax(1i64, false)?;
        if y_hat.numel() != 1 {
            return Err(Error::Shape(format!(
                "expected a single prediction, model produced {}",
                y_hat.numel()
            )));
        }

        let predicted_idx = y_hat.f_reshape([1i64].as_slice())?.f_int64_value(&[0])?;
        Ok(vec![predicted_idx.to_string()])
    }

    pub fn postprocess(&self, output: Vec<String>) -> Vec<String> {
        output
    }

    /// Serve one request: initialize if needed, then preprocess, infer and
    /// postprocess. `None` data yields `None`.
    pub fn handle(
        &self,
        data: Option<&[RequestItem]>,
        ctx: &Context,
    ) -> Result<Option<Vec<String>>> {
        self.initialize(ctx)?;

        let data = match data {
            None => return Ok(None),
            Some(data) => data,
        };

        let input = self.preprocess(data)?;
        let output = self.inference(&input)?;

        Ok(Some(self.postprocess(output)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Handler>();
    }

    #[test]
    fn postprocess_is_identity() {
        let handler = Handler::new();
        let output = vec!["7".to_string()];
        assert_eq!(handler.postprocess(output.clone()), output);
        assert!(handler.postprocess(Vec::new()).is_empty());
    }

    #[test]
    fn inference_needs_a_model() {
        let handler = Handler::new();
        let input = Tensor::zeros([1i64, 784].as_slice(), (tch::Kind::Float, Device::Cpu));
        assert!(matches!(
            handler.inference(&input),
            Err(Error::NotInitialized)
        ));
        assert!(!handler.is_initialized());
        assert_eq!(handler.device(), None);
    }

    #[test]
    fn preprocess_reads_first_item_only() {
        let handler = Handler::new();
        let items = vec![
            RequestItem::data(r#"{"data": [[0.0, 1.0]]}"#),
            RequestItem::data("not json"),
        ];

        let tensor = handler.preprocess(&items).unwrap();
        assert_eq!(tensor.size(), vec![1, 2]);
    }

    #[test]
    fn preprocess_errors() {
        let handler = Handler::new();

        assert!(matches!(handler.preprocess(&[]), Err(Error::EmptyBatch)));
        assert!(matches!(
            handler.preprocess(&[RequestItem::default()]),
            Err(Error::MissingPayload)
        ));
        assert!(matches!(
            handler.preprocess(&[RequestItem::body("{\"data\": [1,")]),
            Err(Error::Json(_))
        ));
    }
}
