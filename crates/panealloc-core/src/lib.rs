//! panealloc-core: pane allocation decisions for a single tmux window.
//!
//! Pure, synchronous building blocks: grid capacity planning, split
//! availability, eviction, spawn targeting, the decision engine, and the
//! session bookkeeping the lifecycle manager owns. All geometry is in
//! terminal cells and all time values are passed in by the caller.

pub mod capacity;
pub mod decision;
pub mod deferred;
pub mod eviction;
pub mod registry;
pub mod split;
pub mod target;
pub mod types;

pub use capacity::{
    GridCapacity, GridPlan, GridSlot, calculate_capacity, compute_grid_plan, map_pane_to_slot,
};
pub use decision::{decide_close_action, decide_spawn_actions};
pub use deferred::{DeferredQueue, DeferredSession, EnqueueOutcome};
pub use eviction::find_oldest_agent_pane;
pub use registry::{SessionRegistry, TrackedSession};
pub use split::{
    best_split_direction, can_split_pane, find_minimal_evictions, is_splittable_at_count,
};
pub use target::{SpawnTarget, find_spawn_target};
pub use types::{
    CapacityConfig, LayoutKind, PaneAction, PaneInfo, SessionMapping, SpawnDecision,
    SplitDirection, WindowState,
};
