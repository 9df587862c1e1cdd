use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::face_locator::FaceLocator;
use crate::shared::model_resolver::{self, ModelResolveError, ProgressFn};

use super::contour_face_locator::ContourFaceLocator;
use super::onnx_blazeface_locator::OnnxBlazefaceLocator;

/// Face-locating backend preference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    /// BlazeFace when its model can be found, contour heuristic otherwise.
    #[default]
    Auto,
    Onnx,
    Contour,
}

#[derive(Debug, Clone)]
pub struct LocatorOptions {
    pub strategy: LocatorStrategy,
    pub confidence: f64,
    pub model_name: String,
    /// Download source for the model when it is not on disk.
    pub model_url: Option<String>,
    /// Directory pre-provisioned with model files.
    pub model_dir: Option<PathBuf>,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("face detection backend unavailable: {0}")]
    Unavailable(#[source] ModelResolveError),
    #[error("failed to load face model {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
}

/// Creates the face locator for `options.strategy`.
///
/// `Onnx` fails when the model cannot be found or loaded. `Auto` logs the
/// reason and degrades to the contour heuristic instead. `progress` reports
/// a model download, if one is needed.
pub fn build_locator(
    options: &LocatorOptions,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn FaceLocator>, BackendError> {
    match options.strategy {
        LocatorStrategy::Contour => {
            log::info!("Using contour face locator");
            Ok(Box::new(ContourFaceLocator::new()))
        }
        LocatorStrategy::Onnx => load_blazeface(options, progress),
        LocatorStrategy::Auto => match load_blazeface(options, progress) {
            Ok(locator) => Ok(locator),
            Err(e) => {
                log::warn!("{e}; falling back to contour face locator");
                Ok(Box::new(ContourFaceLocator::new()))
            }
        },
    }
}

fn load_blazeface(
    options: &LocatorOptions,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn FaceLocator>, BackendError> {
    let path = model_resolver::resolve(
        &options.model_name,
        options.model_url.as_deref(),
        options.model_dir.as_deref(),
        progress,
    )
    .map_err(BackendError::Unavailable)?;

    let locator = OnnxBlazefaceLocator::new(&path, options.confidence)
        .map_err(|source| BackendError::Load {
            path: path.clone(),
            source,
        })?;
    log::info!("Using BlazeFace locator ({})", path.display());
    Ok(Box::new(locator))
}
