//! Compile-time backend selection.
//!
//! The backend is chosen with one of the `dev-*` cargo features, there is no
//! runtime detection nor fallback between accelerated and cpu execution.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

pub type Element = f32;

#[cfg(feature = "dev-ndarray")]
pub type MainBackend = burn::backend::NdArray<Element, i32>;
#[cfg(any(feature = "dev-tch-cpu", feature = "dev-tch-gpu"))]
pub type MainBackend = burn::backend::libtorch::LibTorch<Element>;
#[cfg(feature = "dev-wgpu")]
pub type MainBackend = burn::backend::wgpu::Wgpu<Element, i32>;
#[cfg(feature = "dev-cuda")]
pub type MainBackend = burn::backend::Cuda<Element, i32>;

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }

    /// Human-readable description of the selected backend, logged at startup.
    fn backend_name() -> &'static str;
}

#[cfg(feature = "dev-ndarray")]
impl MainDevice for MainBackend {
    fn backend_name() -> &'static str {
        "ndarray (cpu)"
    }
}
#[cfg(feature = "dev-wgpu")]
impl MainDevice for MainBackend {
    fn backend_name() -> &'static str {
        "wgpu"
    }
}
#[cfg(feature = "dev-cuda")]
impl MainDevice for MainBackend {
    fn backend_name() -> &'static str {
        "cuda"
    }
}
#[cfg(feature = "dev-tch-cpu")]
impl MainDevice for MainBackend {
    fn backend_name() -> &'static str {
        "libtorch (cpu)"
    }
}
#[cfg(all(feature = "dev-tch-gpu", not(target_os = "macos")))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
    fn backend_name() -> &'static str {
        "libtorch (cuda:0)"
    }
}
#[cfg(all(feature = "dev-tch-gpu", target_os = "macos"))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
    fn backend_name() -> &'static str {
        "libtorch (mps)"
    }
}

pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;
impl MainDevice for MainAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
    fn backend_name() -> &'static str {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::backend_name()
    }
}

#[cfg(not(feature = "_dev-has-backend"))]
mod err {
    use super::*;
    std::compile_error!(
        "No dev backend selected. Enable one of the dev-* features in burn-fashion/Cargo.toml."
    );

    // pretend to fallback to ndarray (to avoid too many other unrelated errors)
    pub type MainBackend = burn::backend::NdArray<Element, i32>;
    impl MainDevice for MainBackend {
        fn backend_name() -> &'static str {
            "none"
        }
    }
}
#[cfg(not(feature = "_dev-has-backend"))]
pub use err::*;
