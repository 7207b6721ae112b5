use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::bulk::BatchOutcome;
use crate::cache::CacheStats;
use crate::checker::CheckOutcome;
use crate::colors::PaletteExt;
use crate::snapshot::DomainStatus;

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{:.1} MiB", bytes_f / (KIB * KIB))
    }
}

/// Terminal rendering of outcomes and summaries. Colors are chosen once at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl HumanFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.accent().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.plain().to_string()
        } else {
            text.to_string()
        }
    }

    fn muted(&self, text: &str) -> String {
        if self.use_colors {
            text.muted().to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&self, status: DomainStatus) -> String {
        let text = status.as_str().to_uppercase();
        if self.use_colors {
            text.for_status(status).bold().to_string()
        } else {
            text
        }
    }

    fn mark(&self, success: bool) -> String {
        match (success, self.use_colors) {
            (true, true) => "✓".success().to_string(),
            (false, true) => "✗".failure().to_string(),
            (true, false) => "✓".to_string(),
            (false, false) => "✗".to_string(),
        }
    }

    fn header(&self, text: &str) -> String {
        let rule = "─".repeat(text.chars().count());
        if self.use_colors {
            format!("{}\n{}", text.heading().bold(), rule.muted())
        } else {
            format!("{}\n{}", text, rule)
        }
    }

    fn field(&self, name: &str, value: &str) -> String {
        format!("  {}: {}", self.label(name), self.value(value))
    }

    /// Full report for one domain. DNS records are listed only when
    /// `verbose` is set.
    pub fn format_outcome(&self, outcome: &CheckOutcome, verbose: bool) -> String {
        let mut output = vec![self.header(&outcome.domain)];

        let Some(snapshot) = outcome.snapshot.as_ref().filter(|_| outcome.success) else {
            output.push(format!(
                "  {} {}",
                self.mark(false),
                self.value(outcome.error.as_deref().unwrap_or("Check failed"))
            ));
            output.push(self.muted(&format!(
                "  Checked in {:.2}s",
                outcome.duration.as_secs_f64()
            )));
            return output.join("\n");
        };

        output.push(format!("  {}: {}", self.label("Status"), self.status(snapshot.status)));

        if let Some(whois) = &snapshot.whois {
            if let Some(registrar) = &whois.registrar {
                output.push(self.field("Registrar", registrar));
            }
            if let Some(created) = whois.creation_date {
                output.push(self.field("Created", &format_date(created)));
            }
            if let Some(updated) = whois.updated_date {
                output.push(self.field("Updated", &format_date(updated)));
            }
            if let Some(expires) = whois.expiration_date {
                output.push(self.field("Expires", &format_date(expires)));
            }
            if let Some(days) = snapshot.expires_in_days() {
                let text = if days < 0 {
                    format!("expired {} days ago", -days)
                } else {
                    format!("{} days", days)
                };
                output.push(format!(
                    "  {}: {}",
                    self.label("Days until expiration"),
                    if self.use_colors {
                        text.for_status(snapshot.status).to_string()
                    } else {
                        text
                    }
                ));
            }
            if !whois.name_servers.is_empty() {
                output.push(format!("  {}:", self.label("Name servers")));
                for ns in &whois.name_servers {
                    output.push(format!("    {}", self.value(ns)));
                }
            }
            if verbose && !whois.status.is_empty() {
                output.push(self.field("Registry status", &whois.status.join(", ")));
            }
        }

        if verbose {
            if snapshot.dns_records.is_empty() {
                output.push(format!("  {}: {}", self.label("DNS"), self.muted("no records")));
            } else {
                output.push(format!("  {}:", self.label("DNS")));
                for record in &snapshot.dns_records {
                    let ttl = record
                        .ttl
                        .map(|t| format!(" (ttl {})", t))
                        .unwrap_or_default();
                    output.push(format!(
                        "    {:<6} {}{}",
                        record.record_type.to_string(),
                        self.value(&record.value),
                        self.muted(&ttl)
                    ));
                }
            }
        }

        let source = if outcome.cached { ", cached" } else { "" };
        output.push(self.muted(&format!(
            "  Checked in {:.2}s{}",
            outcome.duration.as_secs_f64(),
            source
        )));

        output.join("\n")
    }

    /// One line per completed domain, as printed during a verbose batch.
    pub fn format_progress_line(&self, done: usize, total: usize, outcome: &CheckOutcome) -> String {
        let detail = if outcome.success {
            if outcome.cached {
                format!("{} (cached)", outcome.status())
            } else {
                outcome.status().to_string()
            }
        } else {
            outcome.error.clone().unwrap_or_default()
        };

        format!(
            "{} [{}/{}] {} {}",
            self.mark(outcome.success),
            done,
            total,
            outcome.domain,
            self.muted(&detail)
        )
    }

    pub fn format_summary(&self, batch: &BatchOutcome) -> String {
        let mut output = vec![self.header("Batch Summary")];
        output.push(self.field("Total domains", &batch.total.to_string()));

        let successful = batch.successful.to_string();
        let failed = batch.failed.to_string();
        if self.use_colors {
            output.push(format!("  {}: {}", self.label("Successful"), successful.success()));
            let failed = if batch.failed > 0 {
                failed.failure()
            } else {
                failed.plain()
            };
            output.push(format!("  {}: {}", self.label("Failed"), failed));
        } else {
            output.push(self.field("Successful", &successful));
            output.push(self.field("Failed", &failed));
        }

        output.push(self.field("From cache", &batch.cached.to_string()));
        output.push(self.field("Success rate", &format!("{:.1}%", batch.success_rate())));
        output.push(self.field(
            "Total time",
            &format!("{:.2}s", batch.duration.as_secs_f64()),
        ));
        output.join("\n")
    }

    /// Listing of domains expiring within `threshold_days`, soonest first.
    pub fn format_expiring(&self, outcomes: &[CheckOutcome], threshold_days: i64) -> String {
        let title = format!("Expiring within {} days", threshold_days);
        let mut output = vec![self.header(&title)];

        if outcomes.is_empty() {
            output.push(self.muted("  none"));
            return output.join("\n");
        }

        let mut sorted: Vec<&CheckOutcome> = outcomes.iter().collect();
        sorted.sort_by_key(|o| o.days_until_expiration().unwrap_or(i64::MAX));

        for outcome in sorted {
            let days = outcome
                .days_until_expiration()
                .map(|d| format!("{} days", d))
                .unwrap_or_default();
            let expires = outcome
                .snapshot
                .as_ref()
                .and_then(|s| s.expiration_date())
                .map(format_date)
                .unwrap_or_default();
            output.push(format!(
                "  {} {} ({}) {}",
                self.status(outcome.status()),
                self.value(&outcome.domain),
                expires,
                self.muted(&days)
            ));
        }

        output.join("\n")
    }

    pub fn format_cache_stats(&self, stats: &CacheStats) -> String {
        [
            self.header("Cache"),
            self.field("Entries", &stats.total_entries.to_string()),
            self.field("Active", &stats.active_entries.to_string()),
            self.field("Expired", &stats.expired_entries.to_string()),
            self.field("Size", &format_bytes(stats.size_bytes)),
        ]
        .join("\n")
    }
}
