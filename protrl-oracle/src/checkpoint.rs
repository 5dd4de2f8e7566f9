use candle_core::{Device, Tensor};
use protrl_core::{Error, Result};
use std::{collections::HashMap, path::Path};

const STATE_DICT_PREFIX: &str = "state_dict.";
const PREDICTOR_PREFIX: &str = "predictor.";

/// Unwraps a `state_dict.` namespace when one is present, then drops a leading `predictor.` from
/// every key. Checkpoints written by a training wrapper carry both.
pub fn normalize_keys(tensors: HashMap<String, Tensor>) -> HashMap<String, Tensor> {
    let wrapped = tensors.keys().any(|k| k.starts_with(STATE_DICT_PREFIX));
    tensors
        .into_iter()
        .filter_map(|(key, tensor)| {
            let key = if wrapped {
                key.strip_prefix(STATE_DICT_PREFIX)?.to_owned()
            } else {
                key
            };
            let key = match key.strip_prefix(PREDICTOR_PREFIX) {
                Some(stripped) => stripped.to_owned(),
                None => key,
            };
            Some((key, tensor))
        })
        .collect()
}

pub fn ensure_keys(tensors: &HashMap<String, Tensor>, expected: &[&str]) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .filter(|key| !tensors.contains_key(**key))
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::checkpoint(format!(
            "missing keys {}",
            missing.join(", ")
        )))
    }
}

/// Reads a safetensors file, normalizes its keys and checks that `expected` are all there.
pub fn load_checkpoint(
    path: &Path,
    device: &Device,
    expected: &[&str],
) -> Result<HashMap<String, Tensor>> {
    if !path.exists() {
        return Err(Error::checkpoint(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let tensors = normalize_keys(candle_core::safetensors::load(path, device)?);
    ensure_keys(&tensors, expected)?;
    Ok(tensors)
}
