mod checkpoint;
mod controller;
mod engine;
mod recovery;

pub use checkpoint::{SessionType, TimerCheckpoint};
pub use controller::TimerController;
pub use engine::{Completion, SegmentPolicy, TimerPhase, TimerStateMachine};
pub use recovery::{reconcile, RecoveryAction, RecoveryOutcome, RecoveryReport};
