//! Model artifact I/O.
//!
//! Persists a trained network as a directory containing `weights.json` (a
//! mapping from head name to an ordered list of layers, each carrying its
//! `shape` and flat row-major `data`) and `config.json` (architecture +
//! hyperparameters), per the artifact format the engine's embedders rely on.
//! Reloading a saved directory must reproduce identical `predict()` output -
//! there is no lossy quantization or reordering on the round trip.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::config::TrainingConfig;
use super::dueling_dqn::ACTION_DIMS;

/// One dense layer's weight + bias, flattened to `data` in row-major
/// `[out_features, in_features]` order for the weight followed by the bias
/// vector is NOT mixed in here - weight and bias are separate `Layer`s so
/// `shape` stays unambiguous.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Layer {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// `weights.json` contents: head name -> ordered layer list.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct WeightsFile {
    pub heads: HashMap<String, Vec<Layer>>,
}

/// Model metadata, serialized as (part of) `config.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub version: String,
    pub input_dim: usize,
    pub hidden_dim: usize,
    pub value_hidden: usize,
    pub advantage_hidden: usize,
    pub training_steps: u64,
    pub games_played: u64,
    pub final_epsilon: f32,
    pub avg_loss: f32,
    pub win_rate: f32,
    pub timestamp: String,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            version: "1.0.0".to_string(),
            input_dim: 45,
            hidden_dim: 128,
            value_hidden: 64,
            advantage_hidden: 32,
            training_steps: 0,
            games_played: 0,
            final_epsilon: 1.0,
            avg_loss: 0.0,
            win_rate: 0.0,
            timestamp: unix_timestamp(),
        }
    }
}

impl ModelMetadata {
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            input_dim: config.input_dim,
            hidden_dim: config.hidden_dim,
            value_hidden: config.value_hidden,
            advantage_hidden: config.advantage_hidden,
            ..Default::default()
        }
    }
}

/// `config.json` contents: architecture dims, action dims and metadata in
/// one file, per the artifact format's `{input dim, hidden units, learning
/// rate, action dims}` contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ConfigFile {
    input_dim: usize,
    hidden_dim: usize,
    value_hidden: usize,
    advantage_hidden: usize,
    learning_rate: f64,
    action_dims: [usize; 4],
    metadata: ModelMetadata,
}

fn unix_timestamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}", duration.as_secs())
}

/// Layer boundary layout shared by [`ModelIO::split_flat`] and
/// [`ModelIO::join_heads`], matching `DuelingDQN::get_weights_flat`'s order:
/// shared1, shared2, value1, value2, then one (linear1, linear2) pair per
/// decision head in `ACTION_DIMS` order.
const HEAD_NAMES: [&str; 4] = ["hand_size", "zap_zap", "play_type", "draw_source"];

pub struct ModelIO;

impl ModelIO {
    /// Split a flat weight vector (as produced by `DuelingDQN::get_weights_flat`)
    /// into the named-head layer layout the artifact format expects.
    fn split_flat(weights: &[f32], config: &TrainingConfig) -> WeightsFile {
        let mut cursor = 0usize;
        let mut take = |rows: usize, cols: usize, weights: &[f32], cursor: &mut usize| -> Layer {
            let w_len = rows * cols;
            let w_data = weights.get(*cursor..*cursor + w_len).unwrap_or(&[]).to_vec();
            *cursor += w_len;
            let b_data = weights.get(*cursor..*cursor + rows).unwrap_or(&[]).to_vec();
            *cursor += rows;
            // Pack weight then bias into one layer's data, shape records both.
            let mut data = w_data;
            data.extend(b_data);
            Layer { shape: vec![rows, cols], data }
        };

        let mut heads: HashMap<String, Vec<Layer>> = HashMap::new();

        let shared1 = take(config.hidden_dim, config.input_dim, weights, &mut cursor);
        let shared2 = take(config.value_hidden, config.hidden_dim, weights, &mut cursor);
        heads.insert("shared".to_string(), vec![shared1, shared2]);

        let value1 = take(config.advantage_hidden, config.value_hidden, weights, &mut cursor);
        let value2 = take(1, config.advantage_hidden, weights, &mut cursor);
        heads.insert("value".to_string(), vec![value1, value2]);

        for (name, &dim) in HEAD_NAMES.iter().zip(ACTION_DIMS.iter()) {
            let l1 = take(config.advantage_hidden, config.value_hidden, weights, &mut cursor);
            let l2 = take(dim, config.advantage_hidden, weights, &mut cursor);
            heads.insert(name.to_string(), vec![l1, l2]);
        }

        WeightsFile { heads }
    }

    /// Inverse of [`Self::split_flat`]: reassemble the flat vector
    /// `DuelingDQN::set_weights_flat` expects.
    fn join_heads(file: &WeightsFile) -> Vec<f32> {
        let mut flat = Vec::new();
        let mut push_layer = |name: &str, idx: usize| {
            if let Some(layer) = file.heads.get(name).and_then(|v| v.get(idx)) {
                flat.extend_from_slice(&layer.data);
            }
        };
        push_layer("shared", 0);
        push_layer("shared", 1);
        push_layer("value", 0);
        push_layer("value", 1);
        for name in HEAD_NAMES {
            push_layer(name, 0);
            push_layer(name, 1);
        }
        flat
    }

    /// Save weights + metadata to `{dir}/weights.json` and `{dir}/config.json`.
    pub fn save_weights(dir: &str, weights: &[f32], metadata: Option<ModelMetadata>) -> Result<(), String> {
        Self::save_checkpoint(
            dir,
            weights,
            &TrainingConfig::default(),
            metadata.as_ref().map(|m| m.training_steps).unwrap_or(0),
            metadata.as_ref().map(|m| m.games_played).unwrap_or(0),
            metadata.as_ref().map(|m| m.final_epsilon).unwrap_or(1.0),
            metadata.as_ref().map(|m| m.avg_loss).unwrap_or(0.0),
            metadata.as_ref().map(|m| m.win_rate).unwrap_or(0.0),
        )
    }

    /// Save a full training checkpoint (weights + architecture + training
    /// progress) as an artifact directory.
    pub fn save_checkpoint(
        dir: &str,
        weights: &[f32],
        config: &TrainingConfig,
        training_steps: u64,
        games_played: u64,
        epsilon: f32,
        avg_loss: f32,
        win_rate: f32,
    ) -> Result<(), String> {
        let dir_path = Path::new(dir);
        fs::create_dir_all(dir_path).map_err(|e| format!("failed to create model dir: {e}"))?;

        let weights_file = Self::split_flat(weights, config);
        let weights_json = serde_json::to_string_pretty(&weights_file)
            .map_err(|e| format!("failed to serialize weights: {e}"))?;
        fs::write(dir_path.join("weights.json"), weights_json)
            .map_err(|e| format!("failed to write weights.json: {e}"))?;

        let metadata = ModelMetadata {
            version: "1.0.0".to_string(),
            input_dim: config.input_dim,
            hidden_dim: config.hidden_dim,
            value_hidden: config.value_hidden,
            advantage_hidden: config.advantage_hidden,
            training_steps,
            games_played,
            final_epsilon: epsilon,
            avg_loss,
            win_rate,
            timestamp: unix_timestamp(),
        };
        let config_file = ConfigFile {
            input_dim: config.input_dim,
            hidden_dim: config.hidden_dim,
            value_hidden: config.value_hidden,
            advantage_hidden: config.advantage_hidden,
            learning_rate: config.learning_rate,
            action_dims: ACTION_DIMS,
            metadata,
        };
        let config_json = serde_json::to_string_pretty(&config_file)
            .map_err(|e| format!("failed to serialize config: {e}"))?;
        fs::write(dir_path.join("config.json"), config_json)
            .map_err(|e| format!("failed to write config.json: {e}"))?;

        Ok(())
    }

    /// Load weights + metadata from an artifact directory.
    pub fn load_weights(dir: &str) -> Result<(Vec<f32>, Option<ModelMetadata>), String> {
        let dir_path = Path::new(dir);
        let weights_json = fs::read_to_string(dir_path.join("weights.json"))
            .map_err(|e| format!("failed to read weights.json: {e}"))?;
        let weights_file: WeightsFile =
            serde_json::from_str(&weights_json).map_err(|e| format!("failed to parse weights.json: {e}"))?;
        let flat = Self::join_heads(&weights_file);

        let metadata = Self::get_metadata(dir).ok().flatten();
        Ok((flat, metadata))
    }

    /// Check whether an artifact directory (containing at least `weights.json`)
    /// exists at `dir`.
    pub fn model_exists(dir: &str) -> bool {
        Path::new(dir).join("weights.json").exists()
    }

    /// Read just `config.json`'s metadata block, without loading weights.
    pub fn get_metadata(dir: &str) -> Result<Option<ModelMetadata>, String> {
        let path = Path::new(dir).join("config.json");
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| format!("failed to read config.json: {e}"))?;
        let config_file: ConfigFile =
            serde_json::from_str(&json).map_err(|e| format!("failed to parse config.json: {e}"))?;
        Ok(Some(config_file.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::dueling_dqn::{DuelingDQN, DuelingDQNConfig};
    use crate::training::CpuBackend;
    use burn::tensor::backend::Backend;

    fn temp_dir(name: &str) -> String {
        let dir = std::env::temp_dir();
        dir.join(format!("zapzap_test_model_{}", name)).to_string_lossy().to_string()
    }

    #[test]
    fn test_save_load_weights_roundtrip() {
        let path = temp_dir("save_load");
        let device = <CpuBackend as Backend>::Device::default();
        let network = DuelingDQN::<CpuBackend>::default_config(&device);
        let weights = network.get_weights_flat();

        ModelIO::save_weights(&path, &weights, None).expect("save failed");
        let (loaded, _) = ModelIO::load_weights(&path).expect("load failed");

        assert_eq!(loaded.len(), weights.len());
        for (a, b) in loaded.iter().zip(weights.iter()) {
            assert!((a - b).abs() < 1e-6, "weights mismatch: {a} vs {b}");
        }

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_save_load_with_metadata() {
        let path = temp_dir("metadata");
        let weights: Vec<f32> = {
            let device = <CpuBackend as Backend>::Device::default();
            DuelingDQN::<CpuBackend>::default_config(&device).get_weights_flat()
        };
        let metadata = ModelMetadata {
            version: "test".to_string(),
            training_steps: 1000,
            games_played: 5000,
            ..Default::default()
        };

        ModelIO::save_weights(&path, &weights, Some(metadata)).expect("save failed");
        let (_, loaded_meta) = ModelIO::load_weights(&path).expect("load failed");
        let loaded_meta = loaded_meta.expect("metadata missing");

        assert_eq!(loaded_meta.training_steps, 1000);
        assert_eq!(loaded_meta.games_played, 5000);

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_model_exists() {
        let path = temp_dir("exists");
        assert!(!ModelIO::model_exists(&path));

        let weights = vec![0.0f32; DuelingDQNConfig::default().input_dim];
        ModelIO::save_weights(&path, &weights, None).expect("save failed");
        assert!(ModelIO::model_exists(&path));

        let _ = fs::remove_dir_all(&path);
    }

    #[test]
    fn test_save_checkpoint_roundtrip() {
        let path = temp_dir("checkpoint");
        let weights: Vec<f32> = {
            let device = <CpuBackend as Backend>::Device::default();
            DuelingDQN::<CpuBackend>::default_config(&device).get_weights_flat()
        };
        let config = TrainingConfig::default();

        ModelIO::save_checkpoint(&path, &weights, &config, 10000, 50000, 0.05, 0.15, 0.25)
            .expect("save failed");

        let (_, meta) = ModelIO::load_weights(&path).expect("load failed");
        let meta = meta.expect("metadata missing");

        assert_eq!(meta.training_steps, 10000);
        assert_eq!(meta.games_played, 50000);
        assert!((meta.final_epsilon - 0.05).abs() < 1e-6);
        assert!((meta.avg_loss - 0.15).abs() < 1e-6);
        assert!((meta.win_rate - 0.25).abs() < 1e-6);

        let _ = fs::remove_dir_all(&path);
    }
}
