// ==========================================
// 仓储层集成测试
// ==========================================
// 测试目标: 各仓储的读写往返、事务语义、状态条件更新
// ==========================================


use garment_aps::domain::calendar::CalendarHoliday;
use garment_aps::domain::order::SizeQuantity;
use garment_aps::domain::types::{HolidayType, OrderStatus};
use garment_aps::engine::builder::DayPlan;
use garment_aps::repository::{
    AllocationRepository, CalendarRepository, CapacityRuleRepository, LearningCurveRepository,
    LineRepository, OrderRepository, RepositoryError,
};

use test_helpers::{create_test_db, date, make_curve, make_line, make_order, make_rule};

// ==========================================
// 测试用例 1: 订单读写往返 (含尺码明细)
// ==========================================

#[test]
fn test_order_roundtrip_with_sizes() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = OrderRepository::new(&db_path).unwrap();

    let mut order = make_order("O1", "C1", 100, date(2026, 6, 30));
    order.buyer_id = Some("BUYER01".to_string());
    order.style_id = Some("STYLE01".to_string());
    order.size_qtys = vec![
        SizeQuantity { size_code: "L".to_string(), qty: 60 },
        SizeQuantity { size_code: "M".to_string(), qty: 40 },
    ];
    repo.insert(&order).unwrap();

    let loaded = repo.find_by_id("O1").unwrap().unwrap();
    assert_eq!(loaded.order_ref, "PO-O1");
    assert_eq!(loaded.buyer_id.as_deref(), Some("BUYER01"));
    assert_eq!(loaded.ship_date, date(2026, 6, 30));
    assert_eq!(loaded.status, OrderStatus::Unscheduled);
    assert_eq!(loaded.size_qtys.len(), 2);
    assert_eq!(loaded.total_quantity(), 100);

    assert!(repo.find_by_id("NO-SUCH").unwrap().is_none());
    assert_eq!(repo.list_unscheduled().unwrap().len(), 1);
}

// ==========================================
// 测试用例 2: 订单状态条件更新
// ==========================================

#[test]
fn test_order_status_conditional_update() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = OrderRepository::new(&db_path).unwrap();
    repo.insert(&make_order("O1", "C1", 100, date(2026, 6, 30))).unwrap();

    repo.update_status("O1", OrderStatus::Unscheduled, OrderStatus::Scheduled, Some("L1"))
        .unwrap();

    // 期望状态不匹配 -> 拒绝
    let result = repo.update_status(
        "O1",
        OrderStatus::Unscheduled,
        OrderStatus::Scheduled,
        Some("L1"),
    );
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidStateTransition { .. })
    ));

    // 订单不存在 -> NotFound
    let result = repo.update_status(
        "NO-SUCH",
        OrderStatus::Unscheduled,
        OrderStatus::Scheduled,
        None,
    );
    assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
}

// ==========================================
// 测试用例 3: 学习曲线读写往返
// ==========================================

#[test]
fn test_curve_roundtrip_and_overwrite() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = LearningCurveRepository::new(&db_path).unwrap();

    repo.upsert(&make_curve("C1", &[(1, 50.0), (5, 75.0), (10, 100.0)]))
        .unwrap();

    let loaded = repo.find_by_id("C1").unwrap().unwrap();
    assert_eq!(loaded.points.len(), 3);
    assert_eq!(loaded.points[1].day, 5);
    assert_eq!(loaded.points[1].efficiency_pct, 75.0);
    assert!(loaded.validate().is_ok());

    // 覆盖写入替换拐点集合
    repo.upsert(&make_curve("C1", &[(1, 60.0), (4, 90.0)])).unwrap();
    let loaded = repo.find_by_id("C1").unwrap().unwrap();
    assert_eq!(loaded.points.len(), 2);
    assert_eq!(loaded.points[0].efficiency_pct, 60.0);

    assert_eq!(repo.list_ids().unwrap(), vec!["C1".to_string()]);
}

// ==========================================
// 测试用例 4: 产线/线组与产能规则
// ==========================================

#[test]
fn test_line_group_and_rule_repos() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let line_repo = LineRepository::new(&db_path).unwrap();
    let rule_repo = CapacityRuleRepository::new(&db_path).unwrap();

    line_repo.insert_group("G1", "一车间").unwrap();
    line_repo.insert_line(&{
        let mut l = make_line("L1", "A1", Some("G1"));
        l.default_capacity = Some(800);
        l
    })
    .unwrap();
    line_repo.insert_line(&make_line("L2", "B1", Some("G1"))).unwrap();

    let lines = line_repo.list_lines().unwrap();
    assert_eq!(lines.len(), 2);
    // 按产线代码升序
    assert_eq!(lines[0].line_code, "A1");
    assert_eq!(lines[0].default_capacity, Some(800));

    let groups = line_repo.list_groups().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].line_ids, vec!["L1".to_string(), "L2".to_string()]);
    assert!(groups[0].contains("L1"));

    let mut rule = make_rule("R1", "L1", 25, 8.0, 85.0, 12.5, date(2026, 1, 1), Some(date(2026, 12, 31)));
    rule.style_id = Some("STYLE01".to_string());
    rule_repo.insert(&rule).unwrap();

    let rules = rule_repo.list_for_line("L1").unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].style_id.as_deref(), Some("STYLE01"));
    assert_eq!(rules[0].effective_to, Some(date(2026, 12, 31)));
    assert!(rule_repo.list_for_line("L2").unwrap().is_empty());
}

// ==========================================
// 测试用例 5: 日历窗口查询
// ==========================================

#[test]
fn test_calendar_range_query() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let repo = CalendarRepository::new(&db_path).unwrap();

    repo.insert(&CalendarHoliday {
        holiday_date: date(2026, 2, 17),
        holiday_type: HolidayType::Full,
        holiday_name: Some("春节".to_string()),
    })
    .unwrap();
    repo.insert(&CalendarHoliday {
        holiday_date: date(2026, 5, 1),
        holiday_type: HolidayType::HalfPm,
        holiday_name: None,
    })
    .unwrap();

    let holidays = repo.list_range(date(2026, 2, 1), date(2026, 2, 28)).unwrap();
    assert_eq!(holidays.len(), 1);
    assert_eq!(holidays[0].holiday_type, HolidayType::Full);

    let holidays = repo.list_range(date(2026, 1, 1), date(2026, 12, 31)).unwrap();
    assert_eq!(holidays.len(), 2);
}

// ==========================================
// 测试用例 6: 产能承诺提交与释放的事务语义
// ==========================================

#[test]
fn test_allocation_commit_release_transactionality() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let line_repo = LineRepository::new(&db_path).unwrap();
    let order_repo = OrderRepository::new(&db_path).unwrap();
    let allocation_repo = AllocationRepository::new(&db_path).unwrap();

    line_repo.insert_line(&make_line("L1", "A1", None)).unwrap();
    order_repo.insert(&make_order("O1", "C1", 1000, date(2026, 6, 30))).unwrap();
    order_repo.insert(&make_order("O2", "C1", 1000, date(2026, 6, 30))).unwrap();

    let days = vec![
        DayPlan {
            plan_date: date(2026, 3, 2),
            production_day: 1,
            efficiency_pct: 50.0,
            capacity_qty: 480,
            planned_qty: 480,
            cumulative_qty: 480,
        },
        DayPlan {
            plan_date: date(2026, 3, 3),
            production_day: 2,
            efficiency_pct: 70.0,
            capacity_qty: 672,
            planned_qty: 520,
            cumulative_qty: 1000,
        },
    ];
    allocation_repo.commit_plan("O1", "L1", &days).unwrap();

    // 订单状态随提交事务转换
    let order = order_repo.find_by_id("O1").unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Scheduled);
    assert_eq!(order.assigned_line.as_deref(), Some("L1"));

    // 已排产订单不可重复提交 (条件更新保护)
    let result = allocation_repo.commit_plan("O1", "L1", &days);
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidStateTransition { .. })
    ));

    // 超限提交整单拒绝: 第一日还剩 0 件
    let overrun = vec![DayPlan {
        plan_date: date(2026, 3, 2),
        production_day: 1,
        efficiency_pct: 50.0,
        capacity_qty: 480,
        planned_qty: 1,
        cumulative_qty: 1,
    }];
    let result = allocation_repo.commit_plan("O2", "L1", &overrun);
    assert!(matches!(result, Err(RepositoryError::CommitConflict { .. })));
    assert!(allocation_repo.list_for_order("O2").unwrap().is_empty());

    // 承诺快照聚合
    let ledger = allocation_repo
        .load_window(&["L1".to_string()], date(2026, 3, 1), date(2026, 3, 31))
        .unwrap();
    assert_eq!(ledger.committed_qty("L1", date(2026, 3, 2)), 480);
    assert_eq!(ledger.committed_qty("L1", date(2026, 3, 3)), 520);

    // 释放: 承诺删除 + 状态回退, 同一事务
    allocation_repo.release_plan("O1").unwrap();
    assert!(allocation_repo.list_for_order("O1").unwrap().is_empty());
    let order = order_repo.find_by_id("O1").unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Unscheduled);
    assert!(order.assigned_line.is_none());
}
