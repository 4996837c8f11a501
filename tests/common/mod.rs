#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::{header, StatusCode};
use serde_json::Value;

use coleta_api::auth::{generate_jwt, Claims};

pub const TEST_JWT_SECRET: &str = "coleta-integration-secret";
pub const TEST_OPERATOR: &str = "coleta-tests";

static SERVER: OnceLock<TestServer> = OnceLock::new();
static COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_coleta-api"));
        cmd.arg("serve")
            .env("COLETA_API_PORT", port.to_string())
            .env("JWT_SECRET", TEST_JWT_SECRET)
            .env("DATABASE_RUN_MIGRATIONS", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // DATABASE_URL is inherited from the environment or .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Shared server for this test binary, or `None` when no database is
/// configured and the calling test should skip.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let _ = dotenvy::dotenv();
    if std::env::var("DATABASE_URL").map(|v| v.trim().is_empty()).unwrap_or(true) {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return Ok(None);
    }

    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(Some(server))
}

/// Direct pool on the test database, for seeding rows the API never writes.
/// Call after `ensure_server` so the schema exists.
pub async fn db_pool() -> Result<sqlx::PgPool> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Client that sends a valid operator token on every request.
pub fn authed_client() -> Result<reqwest::Client> {
    let token = generate_jwt(&Claims::new(TEST_OPERATOR, 1), TEST_JWT_SECRET)?;
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))?,
    );
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}

fn nonce() -> u128 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed) as u128;
    nanos
        .wrapping_mul(31)
        .wrapping_add(seq.wrapping_mul(0x9E37_79B9))
        ^ ((std::process::id() as u128) << 20)
}

/// Upper-case code unlikely to collide with other runs.
pub fn unique_code(tag: &str) -> String {
    format!("{}{:X}", tag.to_uppercase(), nonce() % 0xFFFF_FFFF_FFFF)
}

/// A date centuries ahead so each test owns its day's sequence.
pub fn unique_date() -> NaiveDate {
    let base = NaiveDate::from_ymd_opt(2300, 1, 1).expect("valid base date");
    base + chrono::Duration::days((nonce() % 2_500_000) as i64)
}

pub async fn success_data(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.json::<Value>().await?;
    anyhow::ensure!(status.is_success(), "expected success, got {}: {}", status, body);
    anyhow::ensure!(body["success"] == true, "success flag false or missing: {}", body);
    Ok(body["data"].clone())
}

pub async fn list_day(client: &reqwest::Client, server: &TestServer, date: NaiveDate, include_deleted: bool) -> Result<Vec<Value>> {
    let mut url = server.url(&format!("/api/coleta?from={date}&to={date}"));
    if include_deleted {
        url.push_str("&include_deleted=1");
    }
    let data = success_data(client.get(url).send().await?).await?;
    Ok(data["rows"].as_array().cloned().unwrap_or_default())
}
