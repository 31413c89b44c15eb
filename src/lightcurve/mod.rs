//! Adaptive light-curve binning.

mod adaptive;

pub use adaptive::{
    LightCurveEngine, PlanEntry, SplitOutcome, SplitPlan, SubBinConfig, apply_plan, narrow_config,
    plan_split,
};
