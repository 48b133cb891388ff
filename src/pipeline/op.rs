// src/pipeline/op.rs

use crate::job::{JobHandle, TaggedResult};

/// A running pipeline: a named operation owning one job.
pub trait PipelineOp {
    type Result: TaggedResult;

    fn name(&self) -> &str;

    fn job(&self) -> &JobHandle<Self::Result>;

    /// Human readable summary of the operation's input and output so far.
    fn description(&self) -> String;

    /// Stop routing results and refuse new work. Completion still fires once
    /// in-flight tasks drain, but a cancelled operation reports no output.
    fn cancel(&self) {
        self.job().cancel();
    }

    fn is_cancelled(&self) -> bool {
        self.job().is_cancelled()
    }

    fn is_complete(&self) -> bool {
        self.job().is_complete()
    }
}
