//! Pipeline behaviour against an in-memory query double.

mod common;

use common::FakeQuery;
use grid_core::{Columns, GridRequest, Operator, PaginationMethod, SortSpec};
use grid_db::{DataGrid, GridError, GridQuery, ModelDef, RunOptions, Settings, Stage};
use sea_orm::sea_query::{
    Alias, ConditionalStatement, Expr, Order, OrderedStatement, QueryStatementWriter,
    SqliteQueryBuilder,
};
use sea_orm::DbBackend;
use serde_json::json;

fn settings() -> Settings {
    Settings::new(
        Columns::new()
            .column("foo")
            .alias("bar.baz", "qux")
            .column("computed"),
    )
}

fn sql<P: grid_core::RequestProvider + Send + Sync>(grid: &DataGrid<FakeQuery, P>) -> String {
    grid.query().statement().to_string(SqliteQueryBuilder)
}

#[tokio::test]
async fn test_select_skips_appends_and_keeps_aliases() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[]).with_model(
        ModelDef::new("foo", "foos").append("computed"),
    );
    let mut grid = DataGrid::from_query(query, settings(), GridRequest::new());
    grid.prepare_select().unwrap();
    assert_eq!(grid.query().selected(), ["foo", "bar.baz as qux"]);
}

#[tokio::test]
async fn test_filtered_count_reuses_total_without_filters() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[42, 7]);
    let result = DataGrid::from_query(query, settings(), GridRequest::new())
        .run()
        .await
        .unwrap();
    assert_eq!(result.parameters.total, 42);
    assert_eq!(result.parameters.filtered, 42);
}

#[tokio::test]
async fn test_filtered_count_runs_when_filtered() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[42, 7]);
    let request = GridRequest::new().with_filters(json!([{"foo": "x"}]));
    let mut grid = DataGrid::from_query(query, settings(), request);
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    grid.prepare_filtered_count().await.unwrap();

    assert_eq!(grid.parameters().total, 42);
    assert_eq!(grid.parameters().filtered, 7);
    assert_eq!(grid.query().remaining_counts(), 0);
    assert!(sql(&grid).contains(r#""foo" LIKE '%x%'"#));
}

#[tokio::test]
async fn test_pagination_limits_query_to_requested_page() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[30]);
    let request = GridRequest::new()
        .with_page(2)
        .with_method("single")
        .with_throttle(10);
    let mut grid = DataGrid::from_query(query, settings(), request);
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    grid.prepare_filtered_count().await.unwrap();
    grid.prepare_sort().unwrap();
    grid.prepare_pagination(true).unwrap();

    let p = grid.parameters();
    assert_eq!(
        (p.page, p.pages, p.per_page, p.previous_page, p.next_page),
        (Some(2), Some(3), Some(10), Some(1), Some(3))
    );
    assert_eq!(p.method, Some(PaginationMethod::Single));
    assert!(sql(&grid).ends_with("LIMIT 10 OFFSET 10"), "{}", sql(&grid));
}

#[tokio::test]
async fn test_page_beyond_range_is_clamped() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[30]);
    let request = GridRequest::new().with_page(9).with_throttle(10);
    let result = DataGrid::from_query(query, settings(), request)
        .run()
        .await
        .unwrap();
    assert_eq!(result.parameters.page, Some(3));
    assert_eq!(result.parameters.next_page, None);
}

#[tokio::test]
async fn test_empty_result_is_not_paginated() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[0]);
    let result = DataGrid::from_query(query, settings(), GridRequest::new().with_page(3))
        .run()
        .await
        .unwrap();
    assert!(!result.parameters.is_paginated());
    assert_eq!(result.parameters.pages, None);
    assert!(result.rows.is_empty());
}

#[tokio::test]
async fn test_pagination_can_be_disabled() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[30]);
    let mut grid = DataGrid::from_query(query, settings(), GridRequest::new());
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    grid.prepare_filtered_count().await.unwrap();
    grid.prepare_pagination(false).unwrap();
    assert!(!grid.parameters().is_paginated());
    assert!(!sql(&grid).contains("LIMIT"));
}

#[tokio::test]
async fn test_invalid_throttle_fails_pagination() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[30]);
    let request = GridRequest::new().with_throttle(0);
    let err = DataGrid::from_query(query, settings(), request)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::InvalidThrottle(0)));
    assert_eq!(err.to_string(), "invalid throttle of [0], must be [1] or more");
}

#[tokio::test]
async fn test_settings_override_defaults_but_not_request() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[100]);
    let settings = settings()
        .method(PaginationMethod::Group)
        .threshold(50)
        .throttle(10);
    let result = DataGrid::from_query(query, settings, GridRequest::new().with_throttle(25))
        .run()
        .await
        .unwrap();
    let p = result.parameters;
    assert_eq!(p.method, Some(PaginationMethod::Group));
    assert_eq!(p.threshold, Some(50));
    assert_eq!(p.throttle, Some(25));
    assert_eq!((p.pages, p.per_page), (Some(2), Some(50)));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_unknown_method_falls_back_to_single() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[250]);
    let request = GridRequest::new().with_method("paged");
    let result = DataGrid::from_query(query, settings(), request)
        .run()
        .await
        .unwrap();
    assert_eq!(result.parameters.method, Some(PaginationMethod::Single));
    assert_eq!(result.parameters.pages, Some(3));
    assert!(logs_contain("unknown pagination method"));
}

#[tokio::test]
async fn test_sort_defaults_apply_when_none_requested() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[5]);
    let settings = settings().default_sort(vec![SortSpec::desc("foo"), SortSpec::asc("qux")]);
    let mut grid = DataGrid::from_query(query, settings, GridRequest::new());
    grid.prepare_select().unwrap();
    grid.prepare_sort().unwrap();

    assert_eq!(grid.parameters().sort.len(), 2);
    assert!(sql(&grid).contains(r#"ORDER BY "foo" DESC, "bar"."baz" ASC"#), "{}", sql(&grid));
}

#[tokio::test]
async fn test_request_sort_replaces_defaults() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[5]);
    let settings = settings().default_sort(SortSpec::desc("foo"));
    let request = GridRequest::new().with_sort(SortSpec::new("qux", "DESC"));
    let mut grid = DataGrid::from_query(query, settings, request);
    grid.prepare_select().unwrap();
    grid.prepare_sort().unwrap();

    assert_eq!(grid.parameters().sort, vec![SortSpec::new("qux", "DESC")]);
    let sql = sql(&grid);
    assert!(sql.contains(r#"ORDER BY "bar"."baz" DESC"#), "{sql}");
    assert!(!sql.contains(r#""foo" DESC"#), "{sql}");
}

#[tokio::test]
async fn test_unknown_sort_column_is_an_error() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[5]);
    let request = GridRequest::new().with_sort(SortSpec::asc("missing"));
    let err = DataGrid::from_query(query, settings(), request)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::SortColumnNotFound(c) if c == "missing"));
}

#[tokio::test]
async fn test_invalid_sort_direction_is_an_error() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[5]);
    let request = GridRequest::new().with_sort(SortSpec::new("foo", "sideways"));
    let err = DataGrid::from_query(query, settings(), request)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::InvalidSortDirection(d) if d == "sideways"));
}

#[tokio::test]
async fn test_custom_filter_sort_and_global_replace_builtins() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[10, 4]);
    let settings = settings()
        .filter("bar.baz", |stmt, op, value| {
            assert_eq!(op, Operator::Ge);
            stmt.and_where(Expr::col(Alias::new("custom_baz")).gte(value.to_string()));
        })
        .global(|stmt, _, value| {
            stmt.and_where(Expr::col(Alias::new("search")).eq(value.to_string()));
        })
        .sort_with("foo", |stmt, direction| {
            let order = if direction == Some("desc") { Order::Desc } else { Order::Asc };
            stmt.order_by(Alias::new("custom_foo"), order);
        });
    let request = GridRequest::new()
        .with_filters(json!(["needle", {"qux": "|>=3|"}]))
        .with_sort(SortSpec::desc("foo"));

    let mut grid = DataGrid::from_query(query, settings, request);
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    grid.prepare_filtered_count().await.unwrap();
    grid.prepare_sort().unwrap();

    let sql = sql(&grid);
    assert!(sql.contains(r#""custom_baz" >= '3'"#), "{sql}");
    assert!(sql.contains(r#""search" = 'needle'"#), "{sql}");
    assert!(sql.contains(r#"ORDER BY "custom_foo" DESC"#), "{sql}");
    assert!(!sql.contains("LIKE"), "{sql}");
    assert_eq!(grid.parameters().filters.len(), 2);
    assert_eq!(grid.parameters().filtered, 4);
}

#[tokio::test]
async fn test_regex_tokens_are_plain_text_without_regex_support() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[10, 1]);
    let request = GridRequest::new().with_filters(json!([{"foo": "/^B/"}]));
    let mut grid = DataGrid::from_query(query, settings(), request);
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    assert!(sql(&grid).contains(r#""foo" LIKE '%/^B/%'"#), "{}", sql(&grid));
}

#[tokio::test]
async fn test_hydration_drops_hidden_fields_or_uses_transformer() {
    let rows = vec![json!({"foo": 1, "secret": "x"}), json!({"foo": 2, "secret": "y"})];

    let query = FakeQuery::new(DbBackend::Sqlite, &[2])
        .with_model(ModelDef::new("foo", "foos").hidden("secret"))
        .with_rows(rows.clone());
    let result = DataGrid::from_query(query, settings(), GridRequest::new())
        .run()
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&result.rows).unwrap(),
        json!([{"foo": 1}, {"foo": 2}])
    );

    let query = FakeQuery::new(DbBackend::Sqlite, &[2])
        .with_model(ModelDef::new("foo", "foos").hidden("secret"))
        .with_rows(rows);
    let settings = settings().transformer(|mut row| {
        row.insert("seen".into(), json!(true));
        row
    });
    let result = DataGrid::from_query(query, settings, GridRequest::new())
        .run()
        .await
        .unwrap();
    assert_eq!(result.rows[0]["secret"], json!("x"));
    assert_eq!(result.rows[1]["seen"], json!(true));
}

#[tokio::test]
async fn test_max_results_caps_fetch() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[30]);
    let mut grid = DataGrid::from_query(query, settings(), GridRequest::new().with_throttle(10));
    grid.prepare_select().unwrap();
    grid.prepare_total_count().await.unwrap();
    grid.prepare_filters().await.unwrap();
    grid.prepare_filtered_count().await.unwrap();
    grid.prepare_sort().unwrap();
    grid.prepare_pagination(true).unwrap();
    grid.hydrate(Some(5)).await.unwrap();
    assert!(sql(&grid).contains("LIMIT 5"), "{}", sql(&grid));
    assert_eq!(grid.stage(), Stage::Hydrated);
}

#[tokio::test]
async fn test_stages_cannot_repeat_or_go_back() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[3]);
    let mut grid = DataGrid::from_query(query, settings(), GridRequest::new());
    grid.prepare_select().unwrap();
    assert!(matches!(
        grid.prepare_select(),
        Err(GridError::StageOrder { stage: Stage::Selected, current: Stage::Selected })
    ));

    grid.prepare_sort().unwrap();
    let err = grid.prepare_filters().await.unwrap_err();
    assert!(matches!(
        err,
        GridError::StageOrder { stage: Stage::Filtered, current: Stage::Sorted }
    ));
}

#[tokio::test]
async fn test_run_with_options_returns_all_rows_when_not_paginating() {
    let query = FakeQuery::new(DbBackend::Sqlite, &[3]).with_rows(vec![
        json!({"foo": 1}),
        json!({"foo": 2}),
        json!({"foo": 3}),
    ]);
    let result = DataGrid::from_query(query, settings(), GridRequest::new().with_throttle(1))
        .run_with(RunOptions {
            paginate: false,
            max_results: None,
        })
        .await
        .unwrap();
    assert_eq!(result.rows.len(), 3);
    assert_eq!(result.parameters.per_page, None);
}
