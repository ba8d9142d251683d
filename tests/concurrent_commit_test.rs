// ==========================================
// 并发提交控制测试
// ==========================================
// 职责: 验证产能承诺表的事务化读改写
// 不变量: 任一 (产线, 日期) 的承诺合计永不超过当日产能, 并发提交亦然
// ==========================================


use chrono::NaiveDate;
use garment_aps::domain::types::OrderStatus;
use garment_aps::engine::builder::DayPlan;
use garment_aps::engine::{
    AllocationStore, EngineSettings, LineAvailabilityIndex, SchedulingEngine, WorldSnapshot,
};
use garment_aps::domain::calendar::WorkCalendar;
use garment_aps::repository::{AllocationRepository, LineRepository, OrderRepository};
use garment_aps::repository::{CapacityRuleRepository, LearningCurveRepository};
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use test_helpers::{create_test_db, date, make_curve, make_line, make_order, make_rule};

// ==========================================
// 测试辅助函数
// ==========================================

/// 初始化主数据: 1 条产线 + 1 条曲线 + 1 条规则 + N 个订单
fn seed_master_data(db_path: &str, order_count: usize, order_qty: i64) -> Vec<String> {
    let line_repo = LineRepository::new(db_path).unwrap();
    let curve_repo = LearningCurveRepository::new(db_path).unwrap();
    let rule_repo = CapacityRuleRepository::new(db_path).unwrap();
    let order_repo = OrderRepository::new(db_path).unwrap();

    line_repo.insert_line(&make_line("L1", "A1", None)).unwrap();
    curve_repo.upsert(&make_curve("C1", &[(1, 100.0)])).unwrap();
    rule_repo
        .insert(&make_rule("R1", "L1", 20, 8.0, 100.0, 10.0, date(2026, 1, 1), None))
        .unwrap();

    let mut order_ids = Vec::new();
    for i in 0..order_count {
        let order_id = format!("O{}", i + 1);
        order_repo
            .insert(&make_order(&order_id, "C1", order_qty, date(2026, 6, 30)))
            .unwrap();
        order_ids.push(order_id);
    }
    order_ids
}

/// 构造与 seed_master_data 一致的世界快照 (引擎只从存储读承诺)
fn world_snapshot() -> WorldSnapshot {
    let mut curves = HashMap::new();
    let curve = make_curve("C1", &[(1, 100.0)]);
    curves.insert(curve.curve_id.clone(), curve);
    WorldSnapshot {
        lines: vec![make_line("L1", "A1", None)],
        curves,
        availability: LineAvailabilityIndex::new(vec![make_rule(
            "R1",
            "L1",
            20,
            8.0,
            100.0,
            10.0,
            date(2026, 1, 1),
            None,
        )])
        .unwrap(),
        calendar: WorkCalendar::new(),
    }
}

fn day_plan(plan_date: NaiveDate, planned_qty: i64, capacity_qty: i64) -> DayPlan {
    DayPlan {
        plan_date,
        production_day: 1,
        efficiency_pct: 100.0,
        capacity_qty,
        planned_qty,
        cumulative_qty: planned_qty,
    }
}

// ==========================================
// 测试用例 1: 同一单元格的直接并发提交
// ==========================================

#[test]
fn test_racing_commits_on_same_cell_admit_exactly_one() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_master_data(&db_path, 2, 960);

    let barrier = Arc::new(Barrier::new(2));
    let plan_date = date(2026, 3, 2);

    let mut handles = Vec::new();
    for order_id in ["O1", "O2"] {
        let db_path = db_path.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            // 每个线程独立连接, 模拟独立调用方
            let repo = AllocationRepository::new(&db_path).unwrap();
            barrier.wait();
            // 两个计划都想占满同一天的 960 件产能
            repo.commit_plan(order_id, "L1", &[day_plan(plan_date, 960, 960)])
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok_count, 1, "同一单元格的满额提交只允许一个成功");

    // 承诺合计恰为产能, 无超限
    let repo = AllocationRepository::new(&db_path).unwrap();
    let ledger = repo
        .load_window(&["L1".to_string()], plan_date, plan_date)
        .unwrap();
    assert_eq!(ledger.committed_qty("L1", plan_date), 960);
}

// ==========================================
// 测试用例 2: 并发排产整体不超限
// ==========================================

#[test]
fn test_concurrent_scheduling_never_oversubscribes() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let order_ids = seed_master_data(&db_path, 4, 1900);

    let barrier = Arc::new(Barrier::new(order_ids.len()));
    let mut handles = Vec::new();

    for order_id in order_ids.clone() {
        let db_path = db_path.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let repo = Arc::new(AllocationRepository::new(&db_path).unwrap());
            // 败者重试充足, 让所有订单最终都能落位
            let settings = EngineSettings {
                commit_retries: 8,
                ..EngineSettings::default()
            };
            let engine = SchedulingEngine::new(repo, settings);
            let world = world_snapshot();
            let order = make_order(&order_id, "C1", 1900, date(2026, 6, 30));

            barrier.wait();
            engine.schedule_order(&world, &order, date(2026, 3, 2))
        }));
    }

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    assert!(ok_count >= 1, "至少一个订单排产成功");

    // 不变量: 任一 (产线, 日期) 承诺合计 <= 当日产能 (960)
    let repo = AllocationRepository::new(&db_path).unwrap();
    let mut day = date(2026, 3, 2);
    let end = date(2026, 4, 30);
    while day <= end {
        let ledger = repo.load_window(&["L1".to_string()], day, day).unwrap();
        let total = ledger.committed_qty("L1", day);
        assert!(total <= 960, "日期 {} 承诺合计 {} 超过产能 960", day, total);
        day = day.succ_opt().unwrap();
    }

    // 成功订单的状态已在同一事务内转为 SCHEDULED
    let order_repo = OrderRepository::new(&db_path).unwrap();
    let scheduled = order_repo.list_by_status(OrderStatus::Scheduled).unwrap();
    assert_eq!(scheduled.len(), ok_count);
    for order in &scheduled {
        assert_eq!(order.assigned_line.as_deref(), Some("L1"));
    }
}

// ==========================================
// 测试用例 3: 败者错误形态
// ==========================================

#[test]
fn test_commit_loser_gets_allocation_conflict() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    seed_master_data(&db_path, 2, 960);
    let plan_date = date(2026, 3, 2);

    let repo = AllocationRepository::new(&db_path).unwrap();
    repo.commit_plan("O1", "L1", &[day_plan(plan_date, 960, 960)])
        .unwrap();

    // 引擎存储接口视角: 败者得到 AllocationConflict (可重试语义)
    let store: &dyn AllocationStore = &repo;
    let result = store.commit_plan("O2", "L1", &[day_plan(plan_date, 960, 960)]);
    assert!(matches!(
        result,
        Err(garment_aps::engine::ScheduleError::AllocationConflict(_))
    ));
}
