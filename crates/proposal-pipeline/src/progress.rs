//! Coarse progress milestones for a pipeline run
//!
//! Updates are observational. A full or closed channel drops the update and
//! never fails or blocks the run.

use tokio::sync::mpsc;

/// Milestone reached by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressStage {
    /// Collecting sources into the prompt
    BuildingPrompt,
    /// Source summaries resolved so far
    SummarizingSources { done: usize, total: usize },
    /// Waiting on the strong model
    Generating,
    /// Checking citations
    Validating,
    /// Sections ready
    Complete,
}

/// Progress update message
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub message: String,
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    pub fn new(stage: ProgressStage, message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            stage,
            message: message.into(),
            elapsed_ms,
        }
    }
}

/// Sends [`ProgressUpdate`]s over a tokio channel
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    tx: mpsc::Sender<ProgressUpdate>,
    start_time: std::time::Instant,
}

impl ProgressTracker {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self {
            tx,
            start_time: std::time::Instant::now(),
        }
    }

    /// Create a tracker together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub fn update(&self, stage: ProgressStage, message: impl Into<String>) {
        let elapsed = self.start_time.elapsed().as_millis() as u64;
        let update = ProgressUpdate::new(stage, message, elapsed);
        if let Err(e) = self.tx.try_send(update) {
            tracing::debug!("Dropped progress update: {}", e);
        }
    }

    pub fn building_prompt(&self) {
        self.update(ProgressStage::BuildingPrompt, "Building prompt");
    }

    pub fn summarizing_sources(&self, done: usize, total: usize) {
        self.update(
            ProgressStage::SummarizingSources { done, total },
            format!("Summarizing sources ({}/{})", done, total),
        );
    }

    pub fn generating(&self) {
        self.update(ProgressStage::Generating, "Generating sections");
    }

    pub fn validating(&self) {
        self.update(ProgressStage::Validating, "Validating citations");
    }

    pub fn complete(&self) {
        self.update(ProgressStage::Complete, "Complete");
    }
}
