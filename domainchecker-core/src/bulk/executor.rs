use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::checker::{CheckOutcome, DomainChecker};
use crate::config::CheckerConfig;
use crate::error::Result;
use crate::validation::{is_valid_domain, normalize_domain};

/// Called after each completed domain with (completed, total, outcome).
pub type ProgressCallback = Box<dyn Fn(usize, usize, &CheckOutcome) + Send + Sync>;

/// Aggregate of one `check_many` call.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub cached: usize,
    /// In completion order, not input order.
    pub results: Vec<CheckOutcome>,
    pub duration: Duration,
}

impl BatchOutcome {
    fn from_results(results: Vec<CheckOutcome>, duration: Duration) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let cached = results.iter().filter(|r| r.cached).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            cached,
            results,
            duration,
        }
    }

    /// Percentage of successful checks; 0 for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }

    pub fn expiring_soon(&self, threshold_days: i64) -> Vec<CheckOutcome> {
        filter_expiring_soon(self, threshold_days)
    }

    /// Narrow to the expiring-soon outcomes with every count recomputed
    /// over what remains. The batch duration is kept.
    pub fn into_expiring_soon(self, threshold_days: i64) -> Self {
        Self::from_results(self.expiring_soon(threshold_days), self.duration)
    }
}

/// Successful outcomes whose registration expires within `threshold_days`
/// (already-expired domains included). Failed outcomes never qualify.
pub fn filter_expiring_soon(outcome: &BatchOutcome, threshold_days: i64) -> Vec<CheckOutcome> {
    outcome
        .results
        .iter()
        .filter(|r| r.success)
        .filter(|r| {
            r.days_until_expiration()
                .map(|days| days <= threshold_days)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Drives many domains through a [`DomainChecker`] over a bounded worker
/// pool, consulting an optional [`CacheStore`] first.
#[derive(Debug, Clone)]
pub struct BatchChecker {
    checker: Arc<DomainChecker>,
    cache: Option<Arc<CacheStore>>,
    workers: usize,
    batch_delay: Duration,
}

impl BatchChecker {
    pub fn new(checker: DomainChecker) -> Self {
        Self {
            checker: Arc::new(checker),
            cache: None,
            workers: 10,
            batch_delay: Duration::from_secs(1),
        }
    }

    pub fn from_config(config: &CheckerConfig, cache: Option<CacheStore>) -> Self {
        let batch = Self::new(DomainChecker::from_config(config))
            .with_workers(config.workers)
            .with_batch_delay(config.batch_delay);
        match cache {
            Some(cache) => batch.with_cache(Arc::new(cache)),
            None => batch,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Pause inserted after every `workers` completions.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn checker(&self) -> &DomainChecker {
        &self.checker
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_deref()
    }

    /// Check one domain, serving it from the cache when a live entry
    /// exists and storing fresh successful snapshots.
    ///
    /// Cache failures are logged and treated as a miss.
    pub async fn check_one(&self, domain: &str) -> CheckOutcome {
        let start = Instant::now();

        if let Some(cache) = self.cache.as_deref().filter(|_| is_valid_domain(domain)) {
            let key = normalize_domain(domain);
            match cache.get(&key).await {
                Ok(Some(snapshot)) => {
                    return CheckOutcome::from_cache(key, snapshot, start.elapsed());
                }
                Ok(None) => {}
                Err(e) => warn!(domain = %key, error = %e, "Cache read failed, checking live"),
            }
        }

        let outcome = self.checker.check(domain).await;

        if let (Some(cache), Some(snapshot)) = (self.cache.as_deref(), outcome.snapshot.as_ref()) {
            if let Err(e) = cache.put(&outcome.domain, snapshot).await {
                warn!(domain = %outcome.domain, error = %e, "Cache write failed");
            }
        }

        outcome
    }

    /// Check every domain, at most `workers` at a time.
    ///
    /// After every `workers`-th completion (except the last) dispatch of
    /// further domains pauses for the batch delay. A failing or panicking
    /// domain becomes a failed outcome; the rest of the batch continues.
    ///
    /// Each domain runs in its own task: dropping the returned future
    /// abandons the batch while in-flight lookups finish on their own.
    pub async fn check_many(
        &self,
        domains: Vec<String>,
        progress: Option<ProgressCallback>,
    ) -> BatchOutcome {
        let start = Instant::now();
        let total = domains.len();
        let workers = self.workers;
        let batch_delay = self.batch_delay;
        let completed = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(RwLock::new(()));

        info!(total, workers, delay_ms = batch_delay.as_millis() as u64, "Starting batch");

        let mut results: Vec<(usize, CheckOutcome)> = stream::iter(domains)
            .map(|domain| {
                let completed = completed.clone();
                let gate = gate.clone();
                let progress = progress.as_ref();
                let batch = self.clone();

                async move {
                    // Blocks while a wave pause holds the write side.
                    drop(gate.read().await);

                    let started = Instant::now();
                    let task_domain = domain.clone();
                    let handle =
                        tokio::spawn(async move { batch.check_one(&task_domain).await });

                    let outcome = match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            warn!(domain = %domain, error = %e, "Domain check aborted");
                            CheckOutcome::failed(
                                domain,
                                format!("Batch processing error: {}", e),
                                started.elapsed(),
                            )
                        }
                    };

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                    if let Some(callback) = progress {
                        if catch_unwind(AssertUnwindSafe(|| callback(done, total, &outcome)))
                            .is_err()
                        {
                            warn!(domain = %outcome.domain, "Progress callback panicked");
                        }
                    }

                    if done % workers == 0 && done < total && !batch_delay.is_zero() {
                        let _pause = gate.write().await;
                        debug!(completed = done, "Wave boundary, pausing dispatch");
                        sleep(batch_delay).await;
                    }

                    (done, outcome)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        results.sort_by_key(|(done, _)| *done);
        let outcome = BatchOutcome::from_results(
            results.into_iter().map(|(_, r)| r).collect(),
            start.elapsed(),
        );

        info!(
            total = outcome.total,
            successful = outcome.successful,
            failed = outcome.failed,
            cached = outcome.cached,
            elapsed_ms = outcome.duration.as_millis() as u64,
            "Batch complete"
        );
        outcome
    }

    /// Read domains from a file (see [`parse_domains_from_file`]) and check
    /// them. Fails only if the file cannot be read.
    pub async fn check_file(
        &self,
        path: impl AsRef<Path>,
        progress: Option<ProgressCallback>,
    ) -> Result<BatchOutcome> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let domains = parse_domains_from_file(&content);
        debug!(path = %path.as_ref().display(), count = domains.len(), "Loaded domains");
        Ok(self.check_many(domains, progress).await)
    }
}

/// One domain per line. Blank lines and `#` comments are skipped; for CSV
/// lines only the first column is used.
pub fn parse_domains_from_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let first = line.split(',').next().unwrap_or(line).trim();
            (!first.is_empty()).then(|| first.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::DnsResolver;
    use crate::retry::RetryPolicy;
    use crate::snapshot::{DomainSnapshot, DomainStatus};
    use crate::test_support::{StubDns, StubWhois};
    use crate::whois::{DomainRecord, WhoisClient};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn batch(whois: Arc<StubWhois>) -> BatchChecker {
        let checker = DomainChecker::new()
            .with_whois_client(
                WhoisClient::new()
                    .with_transport(whois)
                    .with_min_interval(Duration::ZERO)
                    .with_retry_policy(RetryPolicy::no_retry()),
            )
            .with_dns_resolver(DnsResolver::new().with_transport(Arc::new(StubDns::new())));
        BatchChecker::new(checker).with_batch_delay(Duration::ZERO)
    }

    fn domains(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("domain{}.com", i)).collect()
    }

    #[tokio::test]
    async fn test_all_domains_succeed() {
        let outcome = batch(Arc::new(StubWhois::new()))
            .with_workers(4)
            .check_many(domains(12), None)
            .await;

        assert_eq!(outcome.total, 12);
        assert_eq!(outcome.successful, 12);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.cached, 0);
        assert_eq!(outcome.results.len(), 12);
        assert_eq!(outcome.success_rate(), 100.0);
    }

    #[tokio::test]
    async fn test_wave_pauses() {
        let delay = Duration::from_millis(50);
        let start = Instant::now();
        let outcome = batch(Arc::new(StubWhois::new()))
            .with_workers(5)
            .with_batch_delay(delay)
            .check_many(domains(25), None)
            .await;

        assert_eq!(outcome.results.len(), 25);
        assert_eq!(outcome.successful, 25);
        assert_eq!(outcome.failed, 0);
        // Boundaries after completions 5, 10, 15 and 20.
        assert!(start.elapsed() >= delay * 4);
        assert!(outcome.duration >= delay * 4);
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let whois = StubWhois::new().failing("domain3.com").failing("domain7.com");
        let input = domains(10);
        let outcome = batch(Arc::new(whois))
            .with_workers(3)
            .check_many(input.clone(), None)
            .await;

        assert_eq!(outcome.successful, 8);
        assert_eq!(outcome.failed, 2);

        let seen: Vec<&str> = outcome.results.iter().map(|r| r.domain.as_str()).collect();
        let unique: HashSet<&str> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 10);
        assert_eq!(unique, input.iter().map(String::as_str).collect());

        let failed: HashSet<&str> = outcome
            .results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.domain.as_str())
            .collect();
        assert_eq!(failed, HashSet::from(["domain3.com", "domain7.com"]));
    }

    #[tokio::test]
    async fn test_panicking_check_becomes_failed_outcome() {
        let whois = StubWhois::new().panicking("domain2.com");
        let outcome = batch(Arc::new(whois))
            .with_workers(2)
            .check_many(domains(4), None)
            .await;

        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.failed, 1);
        let failed = outcome.results.iter().find(|r| !r.success).unwrap();
        assert_eq!(failed.domain, "domain2.com");
        assert!(failed
            .error
            .as_deref()
            .unwrap()
            .starts_with("Batch processing error"));
    }

    #[tokio::test]
    async fn test_progress_reports_every_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress: ProgressCallback = Box::new(move |done, total, outcome| {
            sink.lock().unwrap().push((done, total, outcome.domain.clone()));
        });

        let outcome = batch(Arc::new(StubWhois::new()))
            .with_workers(3)
            .check_many(domains(7), Some(progress))
            .await;

        let seen = seen.lock().unwrap();
        let counts: Vec<usize> = seen.iter().map(|(done, _, _)| *done).collect();
        assert_eq!(counts, (1..=7).collect::<Vec<_>>());
        assert!(seen.iter().all(|(_, total, _)| *total == 7));

        // Results follow the same completion order the callback saw.
        let reported: Vec<&str> = seen.iter().map(|(_, _, d)| d.as_str()).collect();
        let results: Vec<&str> = outcome.results.iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(reported, results);
    }

    #[tokio::test]
    async fn test_panicking_progress_callback_is_contained() {
        let progress: ProgressCallback = Box::new(|_, _, _| panic!("display went away"));
        let outcome = batch(Arc::new(StubWhois::new()))
            .with_workers(2)
            .check_many(domains(5), Some(progress))
            .await;

        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.successful, 5);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = batch(Arc::new(StubWhois::new())).check_many(Vec::new(), None).await;
        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.success_rate(), 0.0);
        assert!(outcome.results.is_empty());
    }

    #[tokio::test]
    async fn test_cache_hits_skip_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::open(dir.path().join("cache.db")).await.unwrap());
        let whois = Arc::new(StubWhois::new().failing("domain2.com"));
        let batch = batch(whois.clone()).with_workers(2).with_cache(cache.clone());

        let first = batch.check_many(domains(3), None).await;
        assert_eq!(first.cached, 0);
        assert_eq!(whois.call_count(), 3);

        let second = batch.check_many(domains(3), None).await;
        assert_eq!(second.cached, 2);
        assert_eq!(second.successful, 2);
        assert_eq!(second.failed, 1);
        // Only the failed domain was looked up again.
        assert_eq!(whois.call_count(), 4);

        let hit = second.results.iter().find(|r| r.cached).unwrap();
        assert!(hit.snapshot.is_some());
        assert!(cache.get("domain2.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_check_one_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::open(dir.path().join("cache.db")).await.unwrap());
        let whois = Arc::new(StubWhois::new());
        let batch = batch(whois.clone()).with_cache(cache);

        let fresh = batch.check_one("https://www.Example.com").await;
        assert!(fresh.success && !fresh.cached);

        let again = batch.check_one("example.com").await;
        assert!(again.success && again.cached);
        assert_eq!(again.domain, "example.com");
        assert_eq!(whois.call_count(), 1);
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configured.db");
        let config = CheckerConfig {
            expiring_threshold_days: 45,
            ..CheckerConfig::default()
        };

        let batch = BatchChecker::from_config(&config, Some(CacheStore::open(&path).await.unwrap()));
        assert_eq!(batch.checker().expiring_threshold(), 45);
        assert_eq!(batch.cache().map(|c| c.path()), Some(path.as_path()));
        assert!(BatchChecker::from_config(&config, None).cache().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::open(dir.path().join("cache.db")).await.unwrap());
        cache
            .put("example.com", &DomainSnapshot::new("example.com", DomainStatus::Active))
            .await
            .unwrap();

        let raw = sqlx::SqlitePool::connect_with(
            sqlx::sqlite::SqliteConnectOptions::new().filename(cache.path()),
        )
        .await
        .unwrap();
        sqlx::query("UPDATE domain_cache SET data = 'not json' WHERE domain = ?")
            .bind("example.com")
            .execute(&raw)
            .await
            .unwrap();
        raw.close().await;
        assert!(cache.get("example.com").await.is_err());

        let whois = Arc::new(StubWhois::new());
        let batch = batch(whois.clone()).with_cache(cache.clone());
        let outcome = batch.check_one("example.com").await;

        assert!(outcome.success && !outcome.cached);
        assert_eq!(whois.call_count(), 1);
        let rewritten = cache.get("example.com").await.unwrap().unwrap();
        assert!(rewritten.whois.is_some());
    }

    #[tokio::test]
    async fn test_abandoned_batch_lets_lookups_finish() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CacheStore::open(dir.path().join("cache.db")).await.unwrap());
        let whois = Arc::new(StubWhois::new().with_delay(Duration::from_millis(100)));
        let batch = batch(whois).with_workers(2).with_cache(cache.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), batch.check_many(domains(2), None))
                .await;
        assert!(abandoned.is_err());

        sleep(Duration::from_millis(400)).await;
        assert!(cache.get("domain1.com").await.unwrap().is_some());
        assert!(cache.get("domain2.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_filter_expiring_soon() {
        let now = Utc::now();
        let whois = StubWhois::new()
            .with_record(DomainRecord::new("soon.com").with_expiration(now + ChronoDuration::days(10)))
            .with_record(DomainRecord::new("lapsed.com").with_expiration(now - ChronoDuration::days(3)))
            .with_record(DomainRecord::new("later.com").with_expiration(now + ChronoDuration::days(365)))
            .with_record(DomainRecord::new("undated.com"))
            .failing("broken.com");

        let outcome = batch(Arc::new(whois))
            .check_many(
                ["soon.com", "lapsed.com", "later.com", "undated.com", "broken.com"]
                    .map(String::from)
                    .to_vec(),
                None,
            )
            .await;

        let mut expiring: Vec<String> = filter_expiring_soon(&outcome, 30)
            .into_iter()
            .map(|r| r.domain)
            .collect();
        expiring.sort();
        assert_eq!(expiring, vec!["lapsed.com", "soon.com"]);
        assert_eq!(outcome.expiring_soon(5).len(), 1);

        let duration = outcome.duration;
        let narrowed = outcome.into_expiring_soon(30);
        assert_eq!(narrowed.total, 2);
        assert_eq!(narrowed.successful, 2);
        assert_eq!(narrowed.failed, 0);
        assert_eq!(narrowed.cached, 0);
        assert_eq!(narrowed.success_rate(), 100.0);
        assert_eq!(narrowed.duration, duration);
    }

    #[test]
    fn test_filter_skips_failed_outcomes_with_snapshot() {
        let mut snapshot = crate::snapshot::DomainSnapshot::new("stale.com", DomainStatus::ExpiringSoon);
        snapshot.whois = Some(
            DomainRecord::new("stale.com").with_expiration(Utc::now() + ChronoDuration::days(2)),
        );
        let mut stale = CheckOutcome::failed("stale.com", "lookup failed", Duration::ZERO);
        stale.snapshot = Some(snapshot.clone());

        let good = CheckOutcome::succeeded("good.com", snapshot, Duration::ZERO);
        let outcome = BatchOutcome::from_results(vec![stale, good], Duration::ZERO);

        let expiring = filter_expiring_soon(&outcome, 30);
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].domain, "good.com");
    }

    #[tokio::test]
    async fn test_check_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domains.txt");
        std::fs::write(&path, "# watched\nexample.com\n\nexample.org,owner\n").unwrap();

        let outcome = batch(Arc::new(StubWhois::new()))
            .check_file(&path, None)
            .await
            .unwrap();
        assert_eq!(outcome.total, 2);

        let missing = batch(Arc::new(StubWhois::new()))
            .check_file(dir.path().join("missing.txt"), None)
            .await;
        assert!(matches!(missing, Err(crate::error::CheckerError::Io(_))));
    }

    #[test]
    fn test_parse_domains_from_file() {
        let content = r#"
# This is a comment
example.com
google.com
  whitespace.com
localhost
csv.example.org,owner,notes
,empty-first-column
"#;

        let domains = parse_domains_from_file(content);
        assert_eq!(
            domains,
            vec![
                "example.com",
                "google.com",
                "whitespace.com",
                "localhost",
                "csv.example.org"
            ]
        );
    }
}
