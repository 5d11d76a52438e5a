use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::model::predictor::TrainedModel;

pub fn save_model(path: impl AsRef<Path>, model: &TrainedModel) -> Result<()> {
    let path = path.as_ref();
    let model_data = bincode::serialize(model)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, model_data)?;
    info!(path = %path.display(), "Saved model artifact");
    Ok(())
}

pub fn load_model(path: impl AsRef<Path>) -> Result<TrainedModel> {
    let path = path.as_ref();
    let model_data = std::fs::read(path)?;
    let model: TrainedModel = bincode::deserialize(&model_data)?;
    info!(
        path = %path.display(),
        features = model.features.len(),
        "Loaded model artifact"
    );
    Ok(model)
}
