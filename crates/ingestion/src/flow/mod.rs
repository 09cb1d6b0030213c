//! Flow result channels

mod analysis;
mod callback;
mod replay;
mod synthetic;

pub use analysis::{AnalysisWorker, FlowAnalyzer};
pub use callback::CallbackFlowChannel;
pub use replay::{ReplayFlowChannel, ReplayRecord};
pub use synthetic::{SyntheticAnalyzer, SyntheticAnalyzerConfig};

use contracts::{FlowResult, FlowResultChannel, VisError};

/// Channel that never produces results (analysis disabled)
#[derive(Debug, Default)]
pub struct NullFlowChannel;

impl FlowResultChannel for NullFlowChannel {
    fn poll_results(&mut self) -> Result<Vec<FlowResult>, VisError> {
        Ok(Vec::new())
    }
}
