use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone, Utc};
use chrono_tz::{America::Sao_Paulo, Tz};
use reqwest::{Client, Method, StatusCode};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::utils::config::Config;

/// Slots missed by more than this are skipped instead of caught up.
const CATCH_UP_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    pub name: &'static str,
    pub hour: u32,
    pub minute: u32,
    pub method: Method,
    pub path: &'static str,
}

impl ScheduledJob {
    fn daily(name: &'static str, hour: u32, method: Method, path: &'static str) -> Self {
        Self {
            name,
            hour,
            minute: 0,
            method,
            path,
        }
    }
}

/// The nightly ingestion run, in pipeline order.
pub fn default_jobs() -> Vec<ScheduledJob> {
    vec![
        ScheduledJob::daily("fetch_stocks", 1, Method::GET, "/api/stocks/fetch"),
        ScheduledJob::daily("save_stock_urls", 2, Method::GET, "/api/news/save-stock-urls"),
        ScheduledJob::daily("fetch_news", 3, Method::POST, "/api/news/fetch"),
        ScheduledJob::daily("update_news_content", 4, Method::POST, "/api/news/update-content"),
        ScheduledJob::daily(
            "fetch_historical_data",
            5,
            Method::GET,
            "/api/historical-data/fetch?pages=2",
        ),
    ]
}

// Wall-clock times skipped by a DST jump run an hour later; repeated ones run
// at their first occurrence.
fn local_time(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    }
}

/// The first job due strictly after `after`. Ties go to the job listed first.
pub fn next_run(jobs: &[ScheduledJob], after: DateTime<Tz>) -> Option<(DateTime<Tz>, &ScheduledJob)> {
    let tz = after.timezone();
    let today = after.date_naive();

    jobs.iter()
        .filter_map(|job| {
            today
                .iter_days()
                .take(2)
                .filter_map(|day| local_time(tz, day, job.hour, job.minute))
                .find(|at| *at > after)
                .map(|at| (at, job))
        })
        .min_by_key(|(at, _)| *at)
}

/// The next slot to run after `last_fired`. A slot that passed while an
/// earlier job was still running is returned even though it lies before
/// `now`, unless it was missed by more than [`CATCH_UP_HOURS`].
pub fn next_due(
    jobs: &[ScheduledJob],
    last_fired: DateTime<Tz>,
    now: DateTime<Tz>,
) -> Option<(DateTime<Tz>, &ScheduledJob)> {
    let oldest = now - Duration::hours(CATCH_UP_HOURS);
    next_run(jobs, last_fired.max(oldest))
}

pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    base_url: String,
    token: String,
    http: Client,
    tz: Tz,
}

impl Scheduler {
    pub fn new(base_url: &str, token: &str, jobs: Vec<ScheduledJob>) -> Self {
        Self {
            jobs,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: Client::new(),
            tz: Sao_Paulo,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.api_base_url, &config.secret_key, default_jobs())
    }

    /// Calls the job's endpoint and returns the response status.
    pub async fn fire(&self, job: &ScheduledJob) -> Result<StatusCode, reqwest::Error> {
        let url = format!("{}{}", self.base_url, job.path);
        let res = self
            .http
            .request(job.method.clone(), &url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(res.status())
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        info!("Scheduler started with {} jobs", self.jobs.len());
        let mut last_fired = Utc::now().with_timezone(&self.tz);
        loop {
            let now = Utc::now().with_timezone(&self.tz);
            let Some((at, job)) = next_due(&self.jobs, last_fired, now) else {
                warn!("Scheduler has no jobs, stopping");
                return;
            };

            if at > now {
                info!("Next job {} at {}", job.name, at.to_rfc3339());
                let wait = (at - now).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;
            } else {
                warn!("Job {} was due at {}, running late", job.name, at.to_rfc3339());
            }
            last_fired = at;

            info!("Running job {}", job.name);
            match self.fire(job).await {
                Ok(status) if status.is_success() => info!("Job {} finished: {status}", job.name),
                Ok(status) => warn!("Job {} returned {status}", job.name),
                Err(e) => error!("Job {} failed: {e}", job.name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Sao_Paulo.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn picks_the_earliest_job_after_now() {
        let jobs = default_jobs();
        let (when, job) = next_run(&jobs, at(2025, 5, 10, 2, 30)).unwrap();
        assert_eq!(job.name, "fetch_news");
        assert_eq!(when, at(2025, 5, 10, 3, 0));
    }

    #[test]
    fn a_job_due_right_now_is_not_picked_again() {
        let jobs = default_jobs();
        let (when, job) = next_run(&jobs, at(2025, 5, 10, 1, 0)).unwrap();
        assert_eq!(job.name, "save_stock_urls");
        assert_eq!(when, at(2025, 5, 10, 2, 0));
    }

    #[test]
    fn wraps_to_the_next_day_after_the_last_job() {
        let jobs = default_jobs();
        let (when, job) = next_run(&jobs, at(2025, 12, 31, 6, 0)).unwrap();
        assert_eq!(job.name, "fetch_stocks");
        assert_eq!(when, at(2026, 1, 1, 1, 0));
    }

    #[test]
    fn skipped_wall_clock_time_runs_an_hour_later() {
        // Sao Paulo jumped from 00:00 to 01:00 on 2018-11-04.
        let jobs = vec![ScheduledJob {
            name: "midnight",
            hour: 0,
            minute: 30,
            method: Method::GET,
            path: "/health",
        }];
        let (when, _) = next_run(&jobs, at(2018, 11, 3, 23, 0)).unwrap();
        assert_eq!(when, at(2018, 11, 4, 1, 30));
    }

    #[test]
    fn slots_passed_during_a_long_job_still_run() {
        let jobs = default_jobs();
        // update_news_content fired at 04:00 and finished at 05:30.
        let (when, job) = next_due(&jobs, at(2025, 5, 10, 4, 0), at(2025, 5, 10, 5, 30)).unwrap();
        assert_eq!(job.name, "fetch_historical_data");
        assert_eq!(when, at(2025, 5, 10, 5, 0));

        let (when, job) = next_due(&jobs, when, at(2025, 5, 10, 5, 31)).unwrap();
        assert_eq!(job.name, "fetch_stocks");
        assert_eq!(when, at(2025, 5, 11, 1, 0));
    }

    #[test]
    fn overrun_across_several_slots_runs_them_in_order() {
        let jobs = default_jobs();
        let now = at(2025, 5, 10, 4, 10);
        let mut last = at(2025, 5, 10, 1, 0);
        let mut ran = Vec::new();
        while let Some((when, job)) = next_due(&jobs, last, now).filter(|(when, _)| *when <= now) {
            ran.push(job.name);
            last = when;
        }
        assert_eq!(ran, ["save_stock_urls", "fetch_news", "update_news_content"]);
    }

    #[test]
    fn long_missed_slots_are_not_replayed() {
        let jobs = default_jobs();
        let (when, job) = next_due(&jobs, at(2025, 5, 8, 4, 0), at(2025, 5, 10, 0, 30)).unwrap();
        assert_eq!(job.name, "fetch_stocks");
        assert_eq!(when, at(2025, 5, 10, 1, 0));
    }

    #[test]
    fn no_jobs_no_run() {
        assert!(next_run(&[], at(2025, 5, 10, 0, 0)).is_none());
    }

    #[tokio::test]
    async fn fire_sends_the_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/news/fetch")
                .header("authorization", "Bearer letmein");
            then.status(200).body("{\"success\": true}");
        });

        let scheduler = Scheduler::new(&server.base_url(), "letmein", default_jobs());
        let status = scheduler.fire(&default_jobs()[2]).await.unwrap();

        mock.assert();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn fire_keeps_the_query_string() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/historical-data/fetch")
                .query_param("pages", "2");
            then.status(404);
        });

        let scheduler = Scheduler::new(&server.base_url(), "letmein", default_jobs());
        let status = scheduler.fire(&default_jobs()[4]).await.unwrap();

        mock.assert();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
