use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

use log::info;
use mnist_serve::{encode_image_bytes, Context, Handler, RequestItem};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "mnist-classify",
    about = "CLI app to classify a handwritten digit with a TorchScript model"
)]
struct CmdArgs {
    #[structopt(help = "Directory holding model.pth")]
    model_dir: PathBuf,

    #[structopt(help = "JSON payload ({\"data\": [[...]]}) or image file to classify")]
    input: PathBuf,

    #[structopt(long, help = "CUDA device to use when one is available")]
    gpu_id: Option<usize>,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let raw = fs::read(&args.input)?;
    let payload = if is_json(&args.input) {
        raw
    } else {
        encode_image_bytes(&raw)?
    };

    let ctx = Context::new(&args.model_dir, args.gpu_id);
    let handler = Handler::new();

    let request = [RequestItem::data(payload)];
    let prediction = handler.handle(Some(&request[..]), &ctx)?;

    let rendered = serde_json::to_string(&prediction)?;
    info!("{}", rendered);
    println!("{}", rendered);

    Ok(())
}
