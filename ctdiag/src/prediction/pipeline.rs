use std::{sync::Arc, time::Instant};

use image::DynamicImage;
use tracing::debug;

use super::{Prediction, PredictionOutput, PredictionStats, parse};
use crate::{
    ImagePreprocessor, ModelId, ModelResolver, Result, infer,
    preprocessing::decode_image,
};

/// Image + model identifier in, diagnosis out.
///
/// Stages run in a fixed order: preprocessing, model resolution, forward
/// pass, parsing. An unreadable image therefore fails before any weights are
/// touched. The first failing stage's error is returned unchanged.
#[derive(Clone)]
pub struct PredictionPipeline {
    resolver: Arc<ModelResolver>,
    preprocessor: ImagePreprocessor,
}

impl PredictionPipeline {
    pub fn new(resolver: Arc<ModelResolver>) -> Self {
        Self {
            resolver,
            preprocessor: ImagePreprocessor::default(),
        }
    }

    pub fn with_preprocessor(
        mut self,
        preprocessor: ImagePreprocessor,
    ) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn resolver(&self) -> &Arc<ModelResolver> {
        &self.resolver
    }

    pub fn predict(
        &self,
        image: &DynamicImage,
        model: ModelId,
    ) -> Result<Prediction> {
        self.predict_detailed(image, model).map(|output| output.prediction)
    }

    pub fn predict_bytes(
        &self,
        bytes: &[u8],
        model: ModelId,
    ) -> Result<Prediction> {
        self.predict_bytes_detailed(bytes, model)
            .map(|output| output.prediction)
    }

    pub fn predict_bytes_detailed(
        &self,
        bytes: &[u8],
        model: ModelId,
    ) -> Result<PredictionOutput> {
        let decode_start = Instant::now();
        let image = decode_image(bytes)?;
        let decode_duration = decode_start.elapsed().as_secs_f64();

        let mut output = self.predict_detailed(&image, model)?;
        output.stats.preprocessing_duration += decode_duration;
        output.stats.total_duration += decode_duration;
        Ok(output)
    }

    pub fn predict_detailed(
        &self,
        image: &DynamicImage,
        model: ModelId,
    ) -> Result<PredictionOutput> {
        let run_start = Instant::now();

        let preprocessing_start = Instant::now();
        let tensor = self.preprocessor.preprocess(image)?;
        let preprocessing_duration =
            preprocessing_start.elapsed().as_secs_f64();

        let resolve_start = Instant::now();
        let network = self.resolver.resolve(model)?;
        let resolve_duration = resolve_start.elapsed().as_secs_f64();

        let forward_start = Instant::now();
        let probabilities = infer(network.as_ref(), &tensor)?;
        let forward_pass_duration = forward_start.elapsed().as_secs_f64();

        let postprocessing_start = Instant::now();
        let prediction = parse(&probabilities, model)?;
        let labelled = model
            .labels()
            .iter()
            .copied()
            .zip(probabilities.iter().copied())
            .collect();
        let postprocessing_duration =
            postprocessing_start.elapsed().as_secs_f64();

        let stats = PredictionStats {
            preprocessing_duration,
            resolve_duration,
            forward_pass_duration,
            postprocessing_duration,
            total_duration: run_start.elapsed().as_secs_f64(),
        };
        debug!(
            %model,
            diagnosis = prediction.diagnosis,
            confidence = prediction.confidence,
            forward_pass = forward_pass_duration,
            total = stats.total_duration,
            "Prediction finished"
        );

        Ok(PredictionOutput {
            prediction,
            probabilities: labelled,
            stats,
        })
    }
}
