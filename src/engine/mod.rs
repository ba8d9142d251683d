// ==========================================
// 服装生产排产系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有拒绝必须输出 reason
// ==========================================

pub mod allocator;
pub mod availability;
pub mod builder;
pub mod capacity_calc;
pub mod conflict;
pub mod curve_eval;
pub mod error;
pub mod ledger_store;
pub mod orchestrator;

// 重导出核心引擎
pub use allocator::{CandidateRanking, GroupAllocator};
pub use availability::{LineAvailabilityIndex, ResolvedCapacity};
pub use builder::{BuildOutcome, DayPlan, ScheduleBuilder};
pub use capacity_calc::CapacityCalculator;
pub use conflict::{Conflict, ConflictDetector, ConflictType};
pub use curve_eval::LearningCurveEvaluator;
pub use error::ScheduleError;
pub use ledger_store::{AllocationStore, InMemoryAllocationStore};
pub use orchestrator::{
    EngineSettings, OrderScheduleOutcome, ScheduleResult, SchedulingEngine, WorldSnapshot,
};
