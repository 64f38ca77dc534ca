#![allow(dead_code)]
use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use grid_db::{GridQuery, ModelDef, PivotDef, Row, SelectItem};
use sea_orm::sea_query::{Alias, SelectStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use serde_json::Value;

pub const USERS: u64 = 171;

#[cfg(feature = "sqlite")]
pub async fn bring_up_sqlite() -> Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    Ok(Database::connect(opts).await?)
}

/// 171 users (`User 001`…), every tenth without email, teams red/blue/green
/// by `id % 3`; posts for users 1–5 (user N has N posts); tags; EAV shoe sizes
/// for users, plus a `car` attribute no user has.
pub async fn seed(conn: &DatabaseConnection) -> Result<()> {
    for ddl in [
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            password TEXT NOT NULL,
            team TEXT NOT NULL
        )",
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, title TEXT NOT NULL)",
        "CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT NOT NULL)",
        "CREATE TABLE user_tags (user_id INTEGER NOT NULL, tag_id INTEGER NOT NULL)",
        "CREATE TABLE attributes (id INTEGER PRIMARY KEY, slug TEXT NOT NULL, namespace TEXT NOT NULL)",
        "CREATE TABLE attribute_values (
            id INTEGER PRIMARY KEY,
            attribute_id INTEGER NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            value TEXT
        )",
    ] {
        conn.execute_unprepared(ddl).await?;
    }

    let teams = ["red", "blue", "green"];
    let users: Vec<String> = (1..=USERS)
        .map(|i| {
            let email = if i % 10 == 0 {
                "NULL".to_string()
            } else {
                format!("'user{i}@example.com'")
            };
            format!(
                "({i}, 'User {i:03}', {email}, 'secret{i}', '{}')",
                teams[(i % 3) as usize]
            )
        })
        .collect();
    conn.execute_unprepared(&format!(
        "INSERT INTO users (id, name, email, password, team) VALUES {}",
        users.join(", ")
    ))
    .await?;

    let mut posts = Vec::new();
    for user in 1..=5u64 {
        for k in 1..=user {
            posts.push(format!("({user}, 'Post {user}-{k}')"));
        }
    }
    conn.execute_unprepared(&format!(
        "INSERT INTO posts (user_id, title) VALUES {}",
        posts.join(", ")
    ))
    .await?;

    for insert in [
        "INSERT INTO tags (id, label) VALUES (1, 'admin'), (2, 'beta')",
        "INSERT INTO user_tags (user_id, tag_id) VALUES (1, 1), (2, 1), (2, 2)",
        "INSERT INTO attributes (id, slug, namespace)
         VALUES (1, 'shoe_size', 'user'), (2, 'wheel_size', 'car')",
        "INSERT INTO attribute_values (attribute_id, entity_type, entity_id, value)
         VALUES (1, 'user', 1, '42'), (1, 'user', 2, '44'), (1, 'user', 3, '42')",
    ] {
        conn.execute_unprepared(insert).await?;
    }

    Ok(())
}

pub fn user_model() -> ModelDef {
    ModelDef::new("user", "users")
        .hidden("password")
        .append("display_name")
        .attribute("shoe_size")
        .has_many("posts", "posts", "user_id", "id")
        .belongs_to_many(
            "tags",
            "tags",
            PivotDef::new("user_tags", "user_id", "tag_id"),
        )
}

pub fn column_values(rows: &[Row], column: &str) -> Vec<Value> {
    rows.iter()
        .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
        .collect()
}

/// In-memory [`GridQuery`]: counts are served in order, rows are fixed.
pub struct FakeQuery {
    pub backend: DbBackend,
    pub stmt: SelectStatement,
    pub model: Option<ModelDef>,
    pub selected: Vec<String>,
    pub counts: Mutex<VecDeque<u64>>,
    pub rows: Vec<Row>,
}

impl FakeQuery {
    pub fn new(backend: DbBackend, counts: &[u64]) -> Self {
        let mut stmt = SelectStatement::new();
        stmt.from(Alias::new("foos"));
        Self {
            backend,
            stmt,
            model: None,
            selected: Vec::new(),
            counts: Mutex::new(counts.iter().copied().collect()),
            rows: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: ModelDef) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Value>) -> Self {
        self.rows = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(m) => Some(m),
                _ => None,
            })
            .collect();
        self
    }

    pub fn remaining_counts(&self) -> usize {
        self.counts.lock().unwrap().len()
    }
}

#[async_trait]
impl GridQuery for FakeQuery {
    fn backend(&self) -> DbBackend {
        self.backend
    }

    fn statement(&self) -> &SelectStatement {
        &self.stmt
    }

    fn statement_mut(&mut self) -> &mut SelectStatement {
        &mut self.stmt
    }

    fn model(&self) -> Option<&ModelDef> {
        self.model.as_ref()
    }

    fn model_mut(&mut self) -> Option<&mut ModelDef> {
        self.model.as_mut()
    }

    fn selected(&self) -> &[String] {
        &self.selected
    }

    fn add_select(&mut self, items: &[SelectItem]) {
        self.selected.extend(items.iter().map(|i| i.to_string()));
    }

    async fn count(&self) -> grid_db::Result<u64> {
        Ok(self.counts.lock().unwrap().pop_front().unwrap_or(0))
    }

    async fn fetch(&self) -> grid_db::Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}
