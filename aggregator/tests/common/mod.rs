//! In-memory stand-ins for the database session and the RPC code source

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use analytics_common::{AnalyticsError, ComputedRow, SqlValue, TimeRange};
use async_trait::async_trait;
use near_aggregator::{ClassificationTarget, ContractRegistry, Database, SdkType, Session};
use near_rpc::{CodeLookup, ContractCodeSource, FetchError};

pub const NANOS: i64 = 1_000_000_000;

/// What the session was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Create(String),
    Drop(String),
    Query { sql: String, range: TimeRange },
    Insert { table: String, rows: usize },
    SetSdkTypes(usize),
    Commit,
    Rollback,
}

type Table = BTreeMap<Vec<String>, ComputedRow>;
type Derived = Box<dyn Fn(&HashMap<String, Table>, TimeRange) -> Vec<ComputedRow> + Send>;

#[derive(Clone, Default)]
struct State {
    tables: HashMap<String, Table>,
    sdk_types: HashMap<String, String>,
}

/// Session double with snapshot-based transactions
#[derive(Default)]
pub struct MemorySession {
    committed: State,
    pending: State,
    sources: HashMap<String, Vec<(i64, ComputedRow)>>,
    derived: HashMap<String, Derived>,
    failing_inserts: Vec<String>,
    pub events: Vec<Event>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned for `sql`, each tagged with its timestamp in nanoseconds
    pub fn with_source(mut self, sql: &str, rows: Vec<(i64, ComputedRow)>) -> Self {
        self.sources.insert(sql.to_string(), rows);
        self
    }

    /// Rows for `sql` computed from the session's own (uncommitted) tables
    pub fn with_derived<F>(mut self, sql: &str, derive: F) -> Self
    where
        F: Fn(&HashMap<String, Table>, TimeRange) -> Vec<ComputedRow> + Send + 'static,
    {
        self.derived.insert(sql.to_string(), Box::new(derive));
        self
    }

    pub fn failing_insert_into(mut self, table: &str) -> Self {
        self.failing_inserts.push(table.to_string());
        self
    }

    /// Committed rows of `table`, in key order
    pub fn committed_rows(&self, table: &str) -> Vec<ComputedRow> {
        self.committed
            .tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.committed.tables.contains_key(table)
    }

    pub fn committed_sdk_type(&self, content_hash: &str) -> Option<String> {
        self.committed.sdk_types.get(content_hash).cloned()
    }

    /// Seed a committed `unique_contracts` row
    pub fn seed_unique_contract(&mut self, row: ComputedRow, sdk_type: &str) {
        let hash = text(&row, 0);
        self.committed
            .tables
            .entry("unique_contracts".to_string())
            .or_default()
            .insert(vec![hash.clone()], row);
        self.committed.sdk_types.insert(hash, sdk_type.to_string());
        self.pending = self.committed.clone();
    }

    /// Seed a committed `unique_contracts` row the label update never matches
    pub fn seed_unmatched_contract(&mut self, row: ComputedRow) {
        self.committed
            .tables
            .entry("unique_contracts".to_string())
            .or_default()
            .insert(vec![text(&row, 0)], row);
        self.pending = self.committed.clone();
    }

    pub fn queries(&self, sql: &str) -> Vec<TimeRange> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Query { sql: s, range } if s == sql => Some(*range),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, wanted: &Event) -> Option<usize> {
        self.events.iter().position(|event| event == wanted)
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.events.iter().filter(|event| *event == wanted).count()
    }
}

/// Primary key columns of the destination tables the tests touch
fn key_columns(table: &str) -> &'static [usize] {
    match table {
        "deployed_contracts" => &[2],
        "daily_transactions_per_account_count" | "daily_receipts_per_contract_count" => &[0, 1],
        _ => &[0],
    }
}

fn table_after(sql: &str, keyword: &[&str]) -> Option<String> {
    let tokens: Vec<String> = sql.split_whitespace().map(|t| t.to_uppercase()).collect();
    let raw: Vec<&str> = sql.split_whitespace().collect();
    tokens
        .windows(keyword.len())
        .position(|w| w.iter().zip(keyword).all(|(a, b)| a == b))
        .and_then(|idx| raw.get(idx + keyword.len()))
        .map(|name| name.trim_end_matches(|c: char| c == '(' || c == ';').to_string())
}

pub fn text(row: &ComputedRow, idx: usize) -> String {
    match row.get(idx) {
        Some(SqlValue::Text(s)) => s.clone(),
        Some(other) => format!("{:?}", other),
        None => String::new(),
    }
}

#[async_trait]
impl ContractRegistry for MemorySession {
    async fn pending_classifications(
        &mut self,
        limit: usize,
    ) -> Result<Vec<ClassificationTarget>, AnalyticsError> {
        let mut pending: Vec<&ComputedRow> = self
            .pending
            .tables
            .get("unique_contracts")
            .map(|t| t.values().collect())
            .unwrap_or_default();
        pending.retain(|row| {
            self.pending
                .sdk_types
                .get(&text(row, 0))
                .map_or(true, |sdk| sdk.is_empty())
        });
        pending.sort_by_key(|row| row.get(3).and_then(SqlValue::as_int).unwrap_or_default());

        Ok(pending
            .into_iter()
            .take(limit)
            .map(|row| ClassificationTarget {
                content_hash: text(row, 0),
                account_id: text(row, 1),
                block_hash: text(row, 4),
            })
            .collect())
    }

    async fn set_sdk_types(&mut self, updates: &[(String, SdkType)]) -> Result<u64, AnalyticsError> {
        self.events.push(Event::SetSdkTypes(updates.len()));
        let mut updated = 0;
        for (hash, sdk_type) in updates {
            if let Some(current) = self.pending.sdk_types.get_mut(hash) {
                if current.is_empty() {
                    *current = sdk_type.as_str().to_string();
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn commit(&mut self) -> Result<(), AnalyticsError> {
        self.events.push(Event::Commit);
        self.committed = self.pending.clone();
        Ok(())
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn batch_execute(&mut self, _database: Database, sql: &str) -> Result<(), AnalyticsError> {
        if let Some(table) = table_after(sql, &["DROP", "TABLE", "IF", "EXISTS"]) {
            self.pending.tables.remove(&table);
            if table == "unique_contracts" {
                self.pending.sdk_types.clear();
            }
            self.events.push(Event::Drop(table));
        }
        if let Some(table) = table_after(sql, &["CREATE", "TABLE", "IF", "NOT", "EXISTS"]) {
            self.pending.tables.entry(table.clone()).or_default();
            self.events.push(Event::Create(table));
        }
        Ok(())
    }

    async fn query(
        &mut self,
        _database: Database,
        sql: &str,
        range: TimeRange,
    ) -> Result<Vec<ComputedRow>, AnalyticsError> {
        self.events.push(Event::Query {
            sql: sql.to_string(),
            range,
        });

        if let Some(derive) = self.derived.get(sql) {
            return Ok(derive(&self.pending.tables, range));
        }

        Ok(self
            .sources
            .get(sql)
            .map(|rows| {
                rows.iter()
                    .filter(|(ts, _)| range.contains_nanos(*ts))
                    .map(|(_, row)| row.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert(&mut self, sql: &str, rows: &[ComputedRow]) -> Result<u64, AnalyticsError> {
        let table = table_after(sql, &["INSERT", "INTO"])
            .ok_or_else(|| AnalyticsError::Query(format!("Not an insert: {}", sql)))?;
        self.events.push(Event::Insert {
            table: table.clone(),
            rows: rows.len(),
        });

        if self.failing_inserts.contains(&table) {
            return Err(AnalyticsError::Query(format!(
                "duplicate key value violates unique constraint on {}",
                table
            )));
        }

        let destination = self
            .pending
            .tables
            .get_mut(&table)
            .ok_or_else(|| AnalyticsError::Query(format!("relation \"{}\" does not exist", table)))?;

        let mut inserted = 0;
        for row in rows {
            let key: Vec<String> = key_columns(&table).iter().map(|&idx| text(row, idx)).collect();
            if destination.contains_key(&key) {
                continue;
            }
            if table == "unique_contracts" {
                self.pending.sdk_types.entry(text(row, 0)).or_default();
            }
            destination.insert(key, row.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn rollback(&mut self) -> Result<(), AnalyticsError> {
        self.events.push(Event::Rollback);
        self.pending = self.committed.clone();
        Ok(())
    }
}

/// `unique_contracts` select evaluated over in-memory `deployed_contracts`
pub fn unique_contracts_from_deployed(
    tables: &HashMap<String, Table>,
    range: TimeRange,
) -> Vec<ComputedRow> {
    let mut first_seen: BTreeMap<String, ComputedRow> = BTreeMap::new();
    let deployed = tables.get("deployed_contracts").into_iter().flat_map(|t| t.values());

    for row in deployed {
        let ts = row.get(3).and_then(SqlValue::as_int).unwrap_or_default();
        if !range.contains_nanos(ts) {
            continue;
        }
        let hash = text(row, 0);
        let earlier = first_seen
            .get(&hash)
            .and_then(|r| r.get(3).and_then(SqlValue::as_int))
            .map_or(false, |seen| seen <= ts);
        if !earlier {
            first_seen.insert(hash, row.clone());
        }
    }

    first_seen.into_values().collect()
}

/// `deployed_contracts` source row: (hash, account, receipt, timestamp_nanos, block)
pub fn deployment(hash: &str, account: &str, receipt: &str, ts_nanos: i64, block: &str) -> ComputedRow {
    ComputedRow::new(vec![
        SqlValue::from(hash),
        SqlValue::from(account),
        SqlValue::from(receipt),
        SqlValue::Int(ts_nanos),
        SqlValue::from(block),
    ])
}

/// What the scripted RPC answers for one account
#[derive(Debug, Clone)]
pub enum Answer {
    Code(Vec<u8>),
    NotFound,
    Exhausted,
}

/// Code source answering from a fixed script and counting calls
#[derive(Default)]
pub struct ScriptedCodeSource {
    answers: HashMap<String, Answer>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCodeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, account_id: &str, answer: Answer) -> Self {
        self.answers.insert(account_id.to_string(), answer);
        self
    }

    pub fn calls_for(&self, account_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.as_str() == account_id)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ContractCodeSource for ScriptedCodeSource {
    async fn fetch_code(&self, account_id: &str, block_id: &str) -> Result<CodeLookup, FetchError> {
        self.calls.lock().unwrap().push(account_id.to_string());
        match self.answers.get(account_id) {
            Some(Answer::Code(code)) => Ok(CodeLookup::Code(code.clone())),
            Some(Answer::NotFound) | None => Ok(CodeLookup::AccountNotFound),
            Some(Answer::Exhausted) => Err(FetchError::RetryExhausted {
                account_id: account_id.to_string(),
                block_id: block_id.to_string(),
                attempts: 3,
                last_error: "HTTP error: status 503".to_string(),
            }),
        }
    }
}

/// Minimal wasm module carrying the Rust SDK markers
pub fn rust_contract() -> Vec<u8> {
    b"\0asm\x01\0\0\0__data_end\0__heap_base\0".to_vec()
}

/// Minimal wasm module carrying the JavaScript SDK markers
pub fn js_contract() -> Vec<u8> {
    b"\0asm\x01\0\0\0JS_TAG_MODULE\0quickjs-libc-min.c\0".to_vec()
}
