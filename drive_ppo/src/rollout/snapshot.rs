//! Serialized weight snapshots for rollout workers.
//!
//! ```text
//! Learner                                   Worker thread
//! ┌──────────────────┐                     ┌──────────────────┐
//! │ model.valid()    │                     │ template model   │
//! │       ↓          │                     │       ↑          │
//! │ into_record()    │                     │ load_record()    │
//! │       ↓          │                     │       ↑          │
//! │ recorder.record()│                     │ recorder.load()  │
//! │       ↓          │                     │       ↑          │
//! │   Vec<u8>  ──────── clone per worker ──→│    Vec<u8>       │
//! └──────────────────┘                     └──────────────────┘
//! ```
//!
//! Each worker owns a private copy of the bytes, so nothing the learner
//! does afterwards can reach a worker's model.

use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;

use crate::error::{Result, TrainError};
use crate::model::ActorCritic;

/// Full parameter set of an [`ActorCritic`], serialized by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSnapshot {
    bytes: Vec<u8>,
}

impl ModelSnapshot {
    /// Serialize the current parameters (buffers included).
    pub fn capture<B: Backend>(model: &ActorCritic<B>) -> Result<Self> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let bytes = Recorder::<B>::record(&recorder, model.clone().into_record(), ())
            .map_err(|e| TrainError::Snapshot(e.to_string()))?;
        Ok(Self { bytes })
    }

    /// Rebuild a model by loading the snapshot into `template`.
    ///
    /// The template only provides structure; every parameter is replaced.
    pub fn restore<B: Backend>(
        &self,
        template: ActorCritic<B>,
        device: &B::Device,
    ) -> Result<ActorCritic<B>> {
        let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
        let record = Recorder::<B>::load(&recorder, self.bytes.clone(), device)
            .map_err(|e| TrainError::Snapshot(e.to_string()))?;
        Ok(template.load_record(record))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActorCriticConfig;
    use burn::backend::NdArray;
    use burn::tensor::Tensor;

    type TestBackend = NdArray<f32>;

    fn to_vec<const D: usize>(tensor: Tensor<TestBackend, D>) -> Vec<f32> {
        tensor.into_data().as_slice::<f32>().unwrap().to_vec()
    }

    #[test]
    fn test_restore_reproduces_outputs() {
        let device = Default::default();
        let config = ActorCriticConfig::new(4, vec![-1.0], vec![3.0]).with_hidden_dim(8);
        let source = config.init::<TestBackend>(&device, 17);

        let snapshot = ModelSnapshot::capture(&source).unwrap();
        assert!(!snapshot.is_empty());

        let restored = snapshot
            .restore(config.init::<TestBackend>(&device, 0), &device)
            .unwrap();

        let obs = Tensor::<TestBackend, 2>::from_floats([[0.3, -0.1, 0.7, 0.0]], &device);
        let (m1, s1, v1) = source.forward(obs.clone());
        let (m2, s2, v2) = restored.forward(obs);
        assert_eq!(to_vec(m1), to_vec(m2));
        assert_eq!(to_vec(s1), to_vec(s2));
        assert_eq!(to_vec(v1), to_vec(v2));
        assert_eq!(to_vec(restored.action_scale()), vec![2.0]);
        assert_eq!(to_vec(restored.action_bias()), vec![1.0]);
    }

    #[test]
    fn test_snapshot_is_a_value_copy() {
        let device = Default::default();
        let config = ActorCriticConfig::new(4, vec![-1.0], vec![1.0]).with_hidden_dim(8);
        let first = ModelSnapshot::capture(&config.init::<TestBackend>(&device, 1)).unwrap();
        let copy = first.clone();
        let second = ModelSnapshot::capture(&config.init::<TestBackend>(&device, 2)).unwrap();

        assert_eq!(first, copy);
        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_bytes_are_an_error() {
        let device = Default::default();
        let config = ActorCriticConfig::new(4, vec![-1.0], vec![1.0]).with_hidden_dim(8);
        let snapshot = ModelSnapshot {
            bytes: vec![1, 2, 3],
        };
        let result = snapshot.restore(config.init::<TestBackend>(&device, 0), &device);
        assert!(matches!(result, Err(TrainError::Snapshot(_))));
    }
}
