//! Camera control side channel
//!
//! The `/zoom` endpoint drives a `ZoomControl`. The bundled implementation,
//! `ZoomController`, keeps the crop rectangle and pushes every change to a
//! `ScalerCrop` (the hardware crop register of the camera pipeline).

pub mod zoom;

pub use zoom::{
    CropRect, LoggingScalerCrop, ScalerCrop, ZoomConfig, ZoomControl, ZoomController, ZoomState,
};
