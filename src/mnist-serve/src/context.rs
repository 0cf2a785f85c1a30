use std::env::{self, VarError};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// File name of the serialized model inside `model_dir`.
pub const MODEL_FILE: &str = "model.pth";

/// Properties the serving host hands to the handler.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SystemProperties {
    /// Directory holding the model artifact
    pub model_dir: PathBuf,

    /// CUDA device index, used only when an accelerator is present
    #[serde(default)]
    pub gpu_id: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Context {
    pub system_properties: SystemProperties,
}

impl Context {
    pub fn new(model_dir: &Path, gpu_id: Option<usize>) -> Self {
        Context {
            system_properties: SystemProperties {
                model_dir: model_dir.to_path_buf(),
                gpu_id,
            },
        }
    }

    /// Build the context from `MODEL_DIR` and `GPU_ID`.
    pub fn from_env() -> Result<Self> {
        let model_dir = env::var_os("MODEL_DIR").ok_or(Error::MissingProperty("model_dir"))?;
        let gpu_id = gpu_id_from_var(env::var("GPU_ID"))?;

        Ok(Context::new(Path::new(&model_dir), gpu_id))
    }

    pub fn model_path(&self) -> PathBuf {
        self.system_properties.model_dir.join(MODEL_FILE)
    }
}

fn gpu_id_from_var(var: std::result::Result<String, VarError>) -> Result<Option<usize>> {
    match var {
        Ok(raw) => Ok(Some(parse_gpu_id(&raw)?)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(raw)) => Err(Error::InvalidProperty {
            name: "gpu_id",
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

pub fn parse_gpu_id(raw: &str) -> Result<usize> {
    raw.trim().parse().map_err(|_| Error::InvalidProperty {
        name: "gpu_id",
        value: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_path_points_into_model_dir() {
        let ctx = Context::new(Path::new("/opt/mnist"), None);
        assert_eq!(ctx.model_path(), PathBuf::from("/opt/mnist/model.pth"));
    }

    #[test]
    fn deserializes_without_gpu_id() {
        let ctx: Context =
            serde_json::from_str(r#"{"system_properties": {"model_dir": "/models"}}"#).unwrap();
        assert_eq!(ctx.system_properties.gpu_id, None);
        assert_eq!(ctx.system_properties.model_dir, PathBuf::from("/models"));
    }

    #[test]
    fn gpu_id_must_be_an_index() {
        assert_eq!(parse_gpu_id(" 2 ").unwrap(), 2);
        assert!(matches!(
            parse_gpu_id("cuda:0"),
            Err(Error::InvalidProperty { name: "gpu_id", .. })
        ));
    }

    #[test]
    fn unset_gpu_id_is_absent_but_garbled_is_not() {
        assert_eq!(gpu_id_from_var(Err(VarError::NotPresent)).unwrap(), None);
        assert_eq!(gpu_id_from_var(Ok("1".into())).unwrap(), Some(1));

        let garbled = VarError::NotUnicode(std::ffi::OsString::from("\u{fffd}1"));
        assert!(matches!(
            gpu_id_from_var(Err(garbled)),
            Err(Error::InvalidProperty { name: "gpu_id", .. })
        ));
    }
}
