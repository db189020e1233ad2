use std::sync::Arc;

use crate::pipeline::{BatchPolicy, Predictor};

pub type AppState = Arc<State>;

/// Everything handlers share. Built once at startup and never mutated.
pub struct State {
    pub predictor: Predictor,
    pub batch_policy: BatchPolicy,
}

impl State {
    pub fn new(predictor: Predictor, batch_policy: BatchPolicy) -> Self {
        Self {
            predictor,
            batch_policy,
        }
    }
}
