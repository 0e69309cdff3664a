#![allow(dead_code)]

use mysync::{BoxFuture, Connection};
use std::sync::Mutex;

/// In-memory connection: serves canned `SHOW CREATE TABLE` output and
/// records every statement it is asked to run.
#[derive(Default)]
pub struct MockConn {
    tables: Vec<(String, String)>,
    fail_on: Option<String>,
    pub queries: Mutex<Vec<String>>,
    pub executed: Mutex<Vec<String>>,
}

impl MockConn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, create: &str) -> Self {
        self.tables.push((name.to_string(), create.to_string()));
        self
    }

    /// Reject any statement containing `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Connection for MockConn {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            if self.fail_on.as_deref().is_some_and(|n| sql.contains(n)) {
                return Err(sqlx::Error::Protocol(format!("rejected: {}", sql)));
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(0)
        })
    }

    fn fetch_text<'a>(
        &'a self,
        sql: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Vec<String>>, sqlx::Error>> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(sql.to_string());

            if sql.starts_with("SHOW FULL TABLES") {
                return Ok(self
                    .tables
                    .iter()
                    .map(|(name, _)| vec![name.clone(), "BASE TABLE".to_string()])
                    .collect());
            }

            let requested = sql
                .strip_prefix("SHOW CREATE TABLE `")
                .and_then(|rest| rest.strip_suffix('`'));
            match requested {
                Some(name) => Ok(self
                    .tables
                    .iter()
                    .filter(|(n, _)| n == name)
                    .map(|(n, text)| vec![n.clone(), text.clone()])
                    .collect()),
                None => Err(sqlx::Error::Protocol(format!("unexpected query: {}", sql))),
            }
        })
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
