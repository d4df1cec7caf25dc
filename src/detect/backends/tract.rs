#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::config::DetectorSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::check_model_pair;
use crate::detect::preprocess::blob_from_frame;
use crate::detect::result::RawDetection;
use crate::detect::ssd::parse_detection_rows;
use crate::frame::Frame;

/// Tract-based backend for the SSD face detector.
///
/// Loads the detector graph (ONNX) from disk and runs it on the CPU. The
/// weights file holds the graph's external tensor data; tract resolves it
/// relative to the graph, so both must live in the same directory.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    input_size: (u32, u32),
    mean: [f32; 3],
}

impl TractBackend {
    /// Load the detector and prepare it for inference.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        topology: P,
        weights: Q,
        settings: &DetectorSettings,
    ) -> Result<Self> {
        let topology = topology.as_ref();
        check_model_pair(topology, weights.as_ref())?;

        let (width, height) = (settings.input_width, settings.input_height);
        let model = tract_onnx::onnx()
            .model_for_path(topology)
            .with_context(|| format!("failed to load detector from {}", topology.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize detector")?
            .into_runnable()
            .context("failed to build runnable detector")?;

        log::info!(
            "tract detector loaded from {} (input {}x{})",
            topology.display(),
            width,
            height
        );

        Ok(Self {
            model,
            input_size: (width, height),
            mean: settings.mean,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let (width, height) = self.input_size;
        let blob = blob_from_frame(frame, self.input_size, self.mean);
        let input = tract_ndarray::Array4::from_shape_vec(
            (1, 3, height as usize, width as usize),
            blob,
        )
        .context("detector input shape mismatch")?;
        Ok(input.into_tensor())
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("detector inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("detector produced no outputs"))?;
        let values = output
            .to_array_view::<f32>()
            .context("detector output tensor was not f32")?;
        let flat: Vec<f32> = values.iter().copied().collect();
        Ok(parse_detection_rows(&flat))
    }

    fn warm_up(&mut self) -> Result<()> {
        let (width, height) = self.input_size;
        let blank = Frame::from_bgr(
            vec![0u8; crate::frame::frame_len(width, height)],
            width,
            height,
        )?;
        self.detect(&blank).map(|_| ())
    }
}
