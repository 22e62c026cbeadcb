use crate::client::Response;
use crate::error::RequestError;
use hyper::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Outcome of one request issued by a simulated user.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub method: Method,
    pub name: String,
    pub status: Option<u16>,
    pub rtt: Duration,
    pub content_length: usize,
    pub error: Option<String>,
}

impl RequestRecord {
    #[must_use]
    pub fn from_result(
        method: Method,
        name: &str,
        rtt: Duration,
        result: &Result<Response, RequestError>,
    ) -> Self {
        let (status, content_length, error) = match result {
            Ok(resp) => (Some(resp.status.as_u16()), resp.body.len(), None),
            Err(RequestError::Status(status)) => {
                (Some(status.as_u16()), 0, Some(format!("HTTP {status}")))
            }
            Err(e) => (None, 0, Some(e.to_string())),
        };
        Self {
            method,
            name: name.to_string(),
            status,
            rtt,
            content_length,
            error,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Round-trip summary for one `METHOD name` pair, times in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatistics {
    pub num_requests: usize,
    pub num_failures: usize,
    pub min_rtt_us: u128,
    pub mean_rtt_us: f64,
    pub median_rtt_us: u128,
    pub p95_rtt_us: u128,
    pub max_rtt_us: u128,
    pub total_content_length: usize,
    pub errors: BTreeMap<String, usize>,
}

/// Running totals for one endpoint. Round-trip times are kept as a
/// histogram of two-significant-digit buckets, so memory depends on the
/// spread of timings and not on the number of requests.
#[derive(Debug, Clone)]
pub struct EndpointAccumulator {
    num_requests: usize,
    num_failures: usize,
    min_rtt: u128,
    max_rtt: u128,
    total_rtt: u128,
    total_content_length: usize,
    rtt_histogram: BTreeMap<u128, usize>,
    errors: BTreeMap<String, usize>,
}

impl Default for EndpointAccumulator {
    fn default() -> Self {
        Self {
            num_requests: 0,
            num_failures: 0,
            min_rtt: u128::MAX,
            max_rtt: u128::MIN,
            total_rtt: 0,
            total_content_length: 0,
            rtt_histogram: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }
}

impl EndpointAccumulator {
    pub fn record(&mut self, rec: &RequestRecord) {
        let cur = rec.rtt.as_micros();
        update_stats(cur, &mut self.min_rtt, &mut self.max_rtt, &mut self.total_rtt);
        *self.rtt_histogram.entry(rtt_bucket(cur)).or_insert(0) += 1;
        self.num_requests += 1;
        self.total_content_length += rec.content_length;
        if let Some(err) = &rec.error {
            self.num_failures += 1;
            *self.errors.entry(err.clone()).or_insert(0) += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.num_requests += other.num_requests;
        self.num_failures += other.num_failures;
        self.min_rtt = self.min_rtt.min(other.min_rtt);
        self.max_rtt = self.max_rtt.max(other.max_rtt);
        self.total_rtt += other.total_rtt;
        self.total_content_length += other.total_content_length;
        for (bucket, count) in &other.rtt_histogram {
            *self.rtt_histogram.entry(*bucket).or_insert(0) += count;
        }
        for (err, count) in &other.errors {
            *self.errors.entry(err.clone()).or_insert(0) += count;
        }
    }

    #[must_use]
    pub fn finish(&self) -> EndpointStatistics {
        let len = self.num_requests;
        EndpointStatistics {
            num_requests: len,
            num_failures: self.num_failures,
            min_rtt_us: if len == 0 { 0 } else { self.min_rtt },
            mean_rtt_us: if len == 0 { 0.0 } else { self.total_rtt as f64 / len as f64 },
            median_rtt_us: percentile(&self.rtt_histogram, len, 0.5),
            p95_rtt_us: percentile(&self.rtt_histogram, len, 0.95),
            max_rtt_us: self.max_rtt,
            total_content_length: self.total_content_length,
            errors: self.errors.clone(),
        }
    }
}

/// Per-endpoint accumulators for one simulated user, merged across users
/// when the run ends.
#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    endpoints: BTreeMap<String, EndpointAccumulator>,
}

impl RequestStats {
    pub fn record(&mut self, rec: &RequestRecord) {
        let key = format!("{} {}", rec.method, rec.name);
        self.endpoints.entry(key).or_default().record(rec);
    }

    pub fn merge(&mut self, other: &Self) {
        for (key, acc) in &other.endpoints {
            self.endpoints.entry(key.clone()).or_default().merge(acc);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// All endpoints folded into one row.
    #[must_use]
    pub fn summary(&self) -> EndpointStatistics {
        self.aggregated().finish()
    }

    fn aggregated(&self) -> EndpointAccumulator {
        let mut total = EndpointAccumulator::default();
        for acc in self.endpoints.values() {
            total.merge(acc);
        }
        total
    }
}

fn update_stats(cur: u128, min: &mut u128, max: &mut u128, total: &mut u128) {
    if cur < *min {
        *min = cur;
    }
    if cur > *max {
        *max = cur;
    }
    *total += cur;
}

/// Rounds to two significant digits, values below 100 are kept exact.
fn rtt_bucket(us: u128) -> u128 {
    let mut scale = 1;
    while us / scale >= 100 {
        scale *= 10;
    }
    (us + scale / 2) / scale * scale
}

/// Nearest-rank percentile over a bucket histogram.
fn percentile(histogram: &BTreeMap<u128, usize>, total: usize, q: f64) -> u128 {
    if total == 0 {
        return 0;
    }
    let rank = ((q * total as f64).ceil() as usize).clamp(1, total);
    let mut seen = 0;
    for (bucket, count) in histogram {
        seen += count;
        if seen >= rank {
            return *bucket;
        }
    }
    0
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub user_class: String,
    pub users: usize,
    pub elapsed_secs: f64,
    pub requests_per_sec: f64,
    pub endpoints: BTreeMap<String, EndpointStatistics>,
    pub aggregated: EndpointStatistics,
}

impl RunReport {
    #[must_use]
    pub fn from_stats(
        user_class: &str,
        users: usize,
        elapsed: Duration,
        stats: &RequestStats,
    ) -> Self {
        let endpoints = stats
            .endpoints
            .iter()
            .map(|(key, acc)| (key.clone(), acc.finish()))
            .collect();
        let aggregated = stats.summary();
        let elapsed_secs = elapsed.as_secs_f64();
        Self {
            user_class: user_class.to_string(),
            users,
            elapsed_secs,
            requests_per_sec: if elapsed_secs > 0.0 {
                aggregated.num_requests as f64 / elapsed_secs
            } else {
                0.0
            },
            endpoints,
            aggregated,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Results for {} ({} users, {:.2}s, {:.2} req/s):",
            self.user_class, self.users, self.elapsed_secs, self.requests_per_sec
        )?;
        writeln!(
            f,
            "    {:<24} {:>8} {:>8}  rtt my s [min, mean, median, p95, max]",
            "name", "reqs", "fails"
        )?;
        let rows = self
            .endpoints
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .chain(std::iter::once(("Aggregated", &self.aggregated)));
        for (name, s) in rows {
            writeln!(
                f,
                "    {:<24} {:>8} {:>8}  [{}, {:.2}, {}, {}, {}]",
                name,
                s.num_requests,
                s.num_failures,
                s.min_rtt_us,
                s.mean_rtt_us,
                s.median_rtt_us,
                s.p95_rtt_us,
                s.max_rtt_us
            )?;
        }
        if !self.aggregated.errors.is_empty() {
            writeln!(f, "Errors:")?;
            for (err, count) in &self.aggregated.errors {
                writeln!(f, "    {count:>8}  {err}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, rtt_us: u64, error: Option<&str>) -> RequestRecord {
        RequestRecord {
            method: Method::GET,
            name: name.to_string(),
            status: Some(if error.is_some() { 500 } else { 200 }),
            rtt: Duration::from_micros(rtt_us),
            content_length: 2,
            error: error.map(str::to_string),
        }
    }

    fn stats_of(records: &[RequestRecord]) -> RequestStats {
        let mut stats = RequestStats::default();
        for rec in records {
            stats.record(rec);
        }
        stats
    }

    #[test]
    fn aggregates_per_endpoint() {
        let stats = stats_of(&[
            record("/checkout", 100, None),
            record("/checkout", 300, None),
            record("/checkout", 200, Some("HTTP 500 Internal Server Error")),
            record("/cart", 50, None),
        ]);
        let report = RunReport::from_stats("CheckoutUser", 2, Duration::from_secs(2), &stats);
        assert_eq!(2, report.endpoints.len());
        let checkout = &report.endpoints["GET /checkout"];
        assert_eq!(3, checkout.num_requests);
        assert_eq!(1, checkout.num_failures);
        assert_eq!(100, checkout.min_rtt_us);
        assert_eq!(300, checkout.max_rtt_us);
        assert_eq!(200, checkout.median_rtt_us);
        assert!((checkout.mean_rtt_us - 200.0).abs() < f64::EPSILON);
        assert_eq!(6, checkout.total_content_length);
        assert_eq!(4, report.aggregated.num_requests);
        assert_eq!(50, report.aggregated.min_rtt_us);
        assert!((report.requests_per_sec - 2.0).abs() < f64::EPSILON);
        assert_eq!(
            Some(&1),
            report.aggregated.errors.get("HTTP 500 Internal Server Error")
        );
    }

    #[test]
    fn merged_users_match_single_stream() {
        let records = [
            record("/checkout", 120, None),
            record("/checkout", 80, Some("Request timed out after 1s")),
            record("/checkout", 4_000, None),
        ];
        let mut first = stats_of(&records[..1]);
        let second = stats_of(&records[1..]);
        first.merge(&second);
        assert_eq!(stats_of(&records).summary(), first.summary());
        let merged = first.summary();
        assert_eq!(3, merged.num_requests);
        assert_eq!(80, merged.min_rtt_us);
        assert_eq!(4_000, merged.max_rtt_us);
        assert_eq!(120, merged.median_rtt_us);
    }

    #[test]
    fn long_runs_stay_bounded() {
        let mut stats = RequestStats::default();
        for i in 0..100_000u64 {
            stats.record(&record("/checkout", 1_000 + (i * 7_919) % 2_000_000, None));
        }
        assert_eq!(1, stats.endpoints.len());
        let acc = &stats.endpoints["GET /checkout"];
        assert_eq!(100_000, acc.num_requests);
        assert!(acc.rtt_histogram.len() <= 400, "{}", acc.rtt_histogram.len());
        assert!(acc.errors.is_empty());
    }

    #[test]
    fn empty_run_has_zeroed_stats() {
        let report =
            RunReport::from_stats("CheckoutUser", 1, Duration::ZERO, &RequestStats::default());
        assert!(report.endpoints.is_empty());
        assert_eq!(0, report.aggregated.num_requests);
        assert_eq!(0, report.aggregated.min_rtt_us);
        assert_eq!(0, report.aggregated.max_rtt_us);
        assert!(report.to_string().contains("Aggregated"));
    }

    #[test]
    fn buckets_keep_two_significant_digits() {
        assert_eq!(7, rtt_bucket(7));
        assert_eq!(99, rtt_bucket(99));
        assert_eq!(120, rtt_bucket(123));
        assert_eq!(12_000, rtt_bucket(12_345));
        assert_eq!(1_000, rtt_bucket(995));
    }

    #[test]
    fn nearest_rank_percentile() {
        let histogram: BTreeMap<u128, usize> = (1..=100).map(|v| (v, 1)).collect();
        assert_eq!(50, percentile(&histogram, 100, 0.5));
        assert_eq!(95, percentile(&histogram, 100, 0.95));
        assert_eq!(100, percentile(&histogram, 100, 1.0));
        assert_eq!(7, percentile(&BTreeMap::from([(7, 1)]), 1, 0.95));
    }

    #[test]
    fn status_failures_keep_their_code() {
        let result = Err(RequestError::Status(hyper::StatusCode::BAD_GATEWAY));
        let rec = RequestRecord::from_result(Method::GET, "/checkout", Duration::ZERO, &result);
        assert_eq!(Some(502), rec.status);
        assert_eq!(Some("HTTP 502 Bad Gateway"), rec.error.as_deref());
        assert!(rec.is_failure());
    }
}
