use log::debug;
use tch::{Cuda, Device};

/// Place work on CUDA device `gpu_id` when an accelerator exists, on the CPU
/// otherwise.
pub fn select_device(gpu_id: Option<usize>) -> Device {
    let device = pick_device(Cuda::is_available(), gpu_id);
    debug!("Selected device {:?}", device);
    device
}

pub fn pick_device(accelerator_available: bool, gpu_id: Option<usize>) -> Device {
    if accelerator_available {
        Device::Cuda(gpu_id.unwrap_or(0))
    } else {
        Device::Cpu
    }
}
