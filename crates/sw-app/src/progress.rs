#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStage {
    LoadingModel,
    CheckingModel,
    Simulating,
    SavingResults,
    Completed,
}

impl SweepStage {
    pub fn label(self) -> &'static str {
        match self {
            Self::LoadingModel => "loading model",
            Self::CheckingModel => "checking model",
            Self::Simulating => "simulating",
            Self::SavingResults => "saving results",
            Self::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SweepProgressEvent {
    pub stage: SweepStage,
    /// Runs finished so far
    pub completed: usize,
    pub total: usize,
    pub elapsed_wall_s: f64,
    pub remaining_s: Option<f64>,
    pub message: Option<String>,
}

impl SweepProgressEvent {
    pub fn stage(stage: SweepStage, total: usize, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            completed: 0,
            total,
            elapsed_wall_s,
            remaining_s: None,
            message,
        }
    }
}
