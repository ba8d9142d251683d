// ==========================================
// 服装生产排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少并发提交时的偶发 busy 错误
// - 提供引擎自有表的建表入口（orders / 曲线 / 规则 / 日历 / 产能承诺）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化引擎自有表
///
/// 幂等：所有建表语句均为 IF NOT EXISTS，可重复调用。
///
/// # 表清单
/// - orders / order_size_qty: 订单主数据与尺码明细
/// - learning_curve / curve_point: 学习曲线主数据
/// - line_group / production_line: 线组与产线
/// - line_capacity_rule: 时间窗产能规则
/// - calendar_holiday: 工作日历假日
/// - committed_allocation: 产能承诺表 (line_id, plan_date) 维度
/// - action_log: 排产动作审计
/// - config_kv: 键值配置
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS line_group (
            group_id TEXT PRIMARY KEY,
            group_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS production_line (
            line_id TEXT PRIMARY KEY,
            line_code TEXT NOT NULL UNIQUE,
            line_name TEXT NOT NULL,
            group_id TEXT REFERENCES line_group(group_id),
            default_capacity INTEGER
        );

        CREATE TABLE IF NOT EXISTS learning_curve (
            curve_id TEXT PRIMARY KEY,
            curve_name TEXT NOT NULL,
            smv_minutes REAL NOT NULL,
            working_minutes_per_day REAL NOT NULL,
            operators INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS curve_point (
            curve_id TEXT NOT NULL REFERENCES learning_curve(curve_id) ON DELETE CASCADE,
            day_no INTEGER NOT NULL,
            efficiency_pct REAL NOT NULL,
            PRIMARY KEY (curve_id, day_no)
        );

        CREATE TABLE IF NOT EXISTS orders (
            order_id TEXT PRIMARY KEY,
            order_ref TEXT NOT NULL,
            buyer_id TEXT,
            style_id TEXT,
            group_id TEXT,
            curve_id TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            ship_date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'UNSCHEDULED',
            assigned_line TEXT REFERENCES production_line(line_id),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS order_size_qty (
            order_id TEXT NOT NULL REFERENCES orders(order_id) ON DELETE CASCADE,
            size_code TEXT NOT NULL,
            qty INTEGER NOT NULL,
            PRIMARY KEY (order_id, size_code)
        );

        CREATE TABLE IF NOT EXISTS line_capacity_rule (
            rule_id TEXT PRIMARY KEY,
            line_id TEXT NOT NULL REFERENCES production_line(line_id),
            order_id TEXT,
            buyer_id TEXT,
            style_id TEXT,
            sam_minutes REAL NOT NULL,
            operators INTEGER NOT NULL,
            working_hours REAL NOT NULL,
            efficiency_pct REAL NOT NULL,
            effective_from TEXT NOT NULL,
            effective_to TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_capacity_rule_line
            ON line_capacity_rule(line_id, effective_from);

        CREATE TABLE IF NOT EXISTS calendar_holiday (
            holiday_date TEXT PRIMARY KEY,
            holiday_type TEXT NOT NULL,
            holiday_name TEXT
        );

        CREATE TABLE IF NOT EXISTS committed_allocation (
            line_id TEXT NOT NULL REFERENCES production_line(line_id),
            plan_date TEXT NOT NULL,
            order_id TEXT NOT NULL REFERENCES orders(order_id),
            planned_qty INTEGER NOT NULL,
            capacity_qty INTEGER NOT NULL,
            production_day INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (line_id, plan_date, order_id)
        );

        CREATE INDEX IF NOT EXISTS idx_committed_allocation_order
            ON committed_allocation(order_id);

        CREATE TABLE IF NOT EXISTS action_log (
            log_id TEXT PRIMARY KEY,
            order_id TEXT NOT NULL,
            action_type TEXT NOT NULL,
            detail_json TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);
        "#,
    )?;
    Ok(())
}
