// src/services/mod.rs
pub mod analyzers;
pub mod capabilities;
pub mod image_processor;
pub mod inference_client;

pub use capabilities::{Capability, CapabilityRegistry};
pub use image_processor::ImageProcessor;
pub use inference_client::InferenceClient;
