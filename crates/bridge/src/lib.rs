//! Bridge core: mirrors message create, edit and delete events from one
//! platform onto every channel bridged with it.

pub mod channels;
pub mod content;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod orchestrator;
pub mod report;
pub mod runtime;

pub use {
    channels::BridgeChannels,
    content::{AssetProbe, HttpProbe},
    error::{Error, Result},
    orchestrator::BridgeOrchestrator,
    report::{BridgeAction, BridgeReport, SkipReason, TargetOutcome, TargetResult},
    runtime::{CoreEvent, Lightning, LightningBuilder},
};
