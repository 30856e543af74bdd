pub mod balance;
pub mod engine;
pub mod status;

pub use engine::{
    Actor, ApprovalSubject, ApprovalWorkflowEngine, Decision, Transition, WorkflowError,
};
pub use status::{DerivedStatus, Track, TrackStatus, Tracks};
