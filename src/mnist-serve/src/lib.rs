//! Digit classification handler for serverless hosts.
//!
//! A [`Handler`] loads a TorchScript model from `<model_dir>/model.pth`,
//! decodes a `{"data": [[...]]}` JSON payload into a tensor, runs a forward
//! pass and answers with the arg-max class index as a string.
//!
//! ```no_run
//! use mnist_serve::{Context, Handler, RequestItem};
//!
//! # fn main() -> mnist_serve::Result<()> {
//! let ctx = Context::from_env()?;
//! let handler = Handler::new();
//!
//! let request = [RequestItem::body(r#"{"data": [[0.0, 0.5, 1.0]]}"#)];
//! let prediction = handler.handle(Some(&request[..]), &ctx)?;
//! assert_eq!(prediction.map(|p| p.len()), Some(1));
//! # Ok(())
//! # }
//! ```

mod context;
mod device;
mod error;
mod handler;
pub mod model;
pub mod payload;
pub mod tensor;
mod timer;

pub use context::{parse_gpu_id, Context, SystemProperties, MODEL_FILE};
pub use device::{pick_device, select_device};
pub use error::{Error, Result};
pub use handler::Handler;
pub use model::{Model, ModelLoader, TorchScript};
pub use payload::{encode_image, encode_image_bytes, RequestItem};
pub use timer::Timer;
