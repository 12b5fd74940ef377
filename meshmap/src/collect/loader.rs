//! Region-sharded building loader.
//!
//! At most one partition is resident. Each load is stamped with a
//! monotonically increasing token; a response whose token is no longer the
//! latest issued is discarded instead of overwriting newer data.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::collect::geojsonl::parse_feature_lines;
use crate::collect::source::DataSource;
use crate::error::{LoadError, RecordParseError};
use crate::geometric::building::BuildingFeature;
use crate::geometric::region::{partition_url, RegionTable};

/// One loaded building partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub region: String,
    pub features: Vec<BuildingFeature>,
    /// Records that were skipped while parsing
    pub errors: Vec<RecordParseError>,
}

/// What a call to [`RegionLoader::ensure_region_loaded`] did.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The region was already resident; nothing was fetched
    AlreadyResident(Rc<Partition>),
    /// The region was fetched and is now resident
    Loaded(Rc<Partition>),
    /// A fetch for this region is already in flight and will land on its own
    InFlight { region: String },
    /// A newer request was issued while this one was in flight; the response
    /// was dropped
    Superseded { region: String },
}

impl LoadOutcome {
    pub fn partition(&self) -> Option<&Rc<Partition>> {
        match self {
            LoadOutcome::AlreadyResident(p) | LoadOutcome::Loaded(p) => Some(p),
            LoadOutcome::InFlight { .. } | LoadOutcome::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    resident: Option<Rc<Partition>>,
    /// Region and token of the most recent request
    pending: Option<(String, u64)>,
    last_error: Option<(String, LoadError)>,
}

/// Keeps the single resident partition for the current viewport.
pub struct RegionLoader {
    regions: RegionTable,
    url_template: String,
    state: RefCell<LoaderState>,
    next_token: Cell<u64>,
    fetches: Cell<usize>,
}

impl RegionLoader {
    pub fn new(regions: RegionTable, url_template: impl Into<String>) -> Self {
        RegionLoader {
            regions,
            url_template: url_template.into(),
            state: RefCell::new(LoaderState::default()),
            next_token: Cell::new(0),
            fetches: Cell::new(0),
        }
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// Region covering `lon`, if any.
    pub fn determine_region(&self, lon: f64) -> Option<&str> {
        self.regions.determine_region(lon)
    }

    pub fn resident(&self) -> Option<Rc<Partition>> {
        self.state.borrow().resident.clone()
    }

    pub fn resident_region(&self) -> Option<String> {
        self.state.borrow().resident.as_ref().map(|p| p.region.clone())
    }

    /// Most recent failure, kept until a later load for any region succeeds.
    pub fn last_error(&self) -> Option<(String, LoadError)> {
        self.state.borrow().last_error.clone()
    }

    /// Number of fetches issued so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }

    /// Drop the resident partition, e.g. when the viewport leaves coverage.
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.resident = None;
        // Invalidate anything in flight as well
        state.pending = None;
        self.next_token.set(self.next_token.get() + 1);
    }

    /// Make `region` the resident partition, fetching it unless it already is.
    ///
    /// On failure the previous partition stays resident and `region` is not
    /// marked current, so the next call retries it.
    pub async fn ensure_region_loaded<S: DataSource>(
        &self,
        source: &S,
        region: &str,
    ) -> Result<LoadOutcome, LoadError> {
        if !self.regions.contains_id(region) {
            return Err(LoadError::UnknownRegion(region.to_string()));
        }

        let token = {
            let mut state = self.state.borrow_mut();
            if let Some(resident) = state.resident.as_ref().filter(|p| p.region == region) {
                let resident = Rc::clone(resident);
                // A stale request for another region must not replace this one
                state.pending = None;
                self.next_token.set(self.next_token.get() + 1);
                debug!(region, "partition already resident");
                return Ok(LoadOutcome::AlreadyResident(resident));
            }
            if let Some((pending, token)) = state.pending.as_ref() {
                if pending == region {
                    debug!(region, token, "partition fetch already in flight");
                    return Ok(LoadOutcome::InFlight {
                        region: region.to_string(),
                    });
                }
            }
            let token = self.next_token.get() + 1;
            self.next_token.set(token);
            state.pending = Some((region.to_string(), token));
            token
        };

        let url = partition_url(&self.url_template, region);
        info!(region, %url, token, "loading building partition");
        self.fetches.set(self.fetches.get() + 1);
        let fetched = source.fetch_text(&url).await;

        let mut state = self.state.borrow_mut();
        let latest = self.next_token.get() == token;

        let text = match fetched {
            Ok(text) => text,
            Err(err) => {
                let err = LoadError::from(err);
                warn!(region, token, error = %err, "building partition fetch failed");
                if latest {
                    state.pending = None;
                    state.last_error = Some((region.to_string(), err.clone()));
                }
                return Err(err);
            }
        };

        if !latest {
            debug!(
                region,
                token,
                latest = self.next_token.get(),
                "discarding stale partition response"
            );
            return Ok(LoadOutcome::Superseded {
                region: region.to_string(),
            });
        }

        let parsed = parse_feature_lines(&text);
        info!(
            region,
            features = parsed.features.len(),
            skipped = parsed.errors.len(),
            "building partition loaded"
        );

        let partition = Rc::new(Partition {
            region: region.to_string(),
            features: parsed.features,
            errors: parsed.errors,
        });
        state.resident = Some(Rc::clone(&partition));
        state.pending = None;
        state.last_error = None;

        Ok(LoadOutcome::Loaded(partition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::collections::HashMap;
    use std::time::Duration;

    fn line(lon: f64, id: &str) -> String {
        format!(
            r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{},33.6]}},"properties":{{"usage_code":"411","building_id":"{}"}}}}"#,
            lon, id
        )
    }

    /// In-memory source with per-location delays and failure injection.
    #[derive(Default)]
    struct FakeSource {
        bodies: HashMap<String, String>,
        delays_ms: HashMap<String, u64>,
        failing: RefCell<Vec<String>>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeSource {
        fn with(mut self, region: &str, body: String) -> Self {
            self.bodies.insert(format!("{}.geojsonl", region), body);
            self
        }

        fn delay(mut self, region: &str, ms: u64) -> Self {
            self.delays_ms.insert(format!("{}.geojsonl", region), ms);
            self
        }

        fn fail(&self, region: &str) {
            self.failing.borrow_mut().push(format!("{}.geojsonl", region));
        }

        fn heal(&self) {
            self.failing.borrow_mut().clear();
        }
    }

    impl DataSource for FakeSource {
        async fn fetch_text(&self, location: &str) -> Result<String, FetchError> {
            self.calls.borrow_mut().push(location.to_string());
            if let Some(ms) = self.delays_ms.get(location) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failing.borrow().iter().any(|l| l == location) {
                return Err(FetchError::Http {
                    url: location.to_string(),
                    status: 503,
                });
            }
            self.bodies
                .get(location)
                .cloned()
                .ok_or_else(|| FetchError::Http {
                    url: location.to_string(),
                    status: 404,
                })
        }
    }

    fn loader() -> RegionLoader {
        RegionLoader::new(RegionTable::fukuoka_default(), "{region}.geojsonl")
    }

    fn source() -> FakeSource {
        FakeSource::default()
            .with("lon_2", format!("{}\n{}", line(130.45, "a"), line(130.5, "b")))
            .with("lon_3", line(130.65, "c"))
    }

    #[tokio::test]
    async fn test_second_call_does_not_fetch() {
        let loader = loader();
        let source = source();

        let first = loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        assert!(matches!(first, LoadOutcome::Loaded(_)));
        let second = loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        assert!(matches!(second, LoadOutcome::AlreadyResident(_)));

        assert_eq!(loader.fetch_count(), 1);
        assert_eq!(source.calls.borrow().len(), 1);
        assert_eq!(loader.resident().unwrap().features.len(), 2);
    }

    #[tokio::test]
    async fn test_new_region_replaces_resident() {
        let loader = loader();
        let source = source();

        loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        loader.ensure_region_loaded(&source, "lon_3").await.unwrap();

        let resident = loader.resident().unwrap();
        assert_eq!(resident.region, "lon_3");
        let ids: Vec<_> = resident
            .features
            .iter()
            .filter_map(|f| f.id.as_deref())
            .collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_and_allows_retry() {
        let loader = loader();
        let source = source();

        loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        source.fail("lon_3");
        let err = loader.ensure_region_loaded(&source, "lon_3").await;
        assert!(matches!(err, Err(LoadError::Fetch(FetchError::Http { status: 503, .. }))));
        assert_eq!(loader.resident_region().as_deref(), Some("lon_2"));
        assert_eq!(loader.last_error().unwrap().0, "lon_3");

        source.heal();
        let retried = loader.ensure_region_loaded(&source, "lon_3").await.unwrap();
        assert!(matches!(retried, LoadOutcome::Loaded(_)));
        assert_eq!(loader.resident_region().as_deref(), Some("lon_3"));
        assert!(loader.last_error().is_none());
        assert_eq!(loader.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_unknown_region() {
        let loader = loader();
        let source = source();
        assert!(matches!(
            loader.ensure_region_loaded(&source, "lon_99").await,
            Err(LoadError::UnknownRegion(_))
        ));
        assert_eq!(loader.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let loader = loader();
        // lon_2 is slow, lon_3 answers first
        let source = source().delay("lon_2", 500).delay("lon_3", 10);

        let (slow, fast) = tokio::join!(
            loader.ensure_region_loaded(&source, "lon_2"),
            loader.ensure_region_loaded(&source, "lon_3"),
        );

        assert!(matches!(slow.unwrap(), LoadOutcome::Superseded { .. }));
        assert!(matches!(fast.unwrap(), LoadOutcome::Loaded(_)));
        assert_eq!(loader.resident_region().as_deref(), Some("lon_3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_discarded_after_switch_back() {
        let loader = loader();
        let source = source().delay("lon_3", 500);

        loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        // Start loading lon_3, then return to lon_2 before it resolves
        let (stale, back) = tokio::join!(
            loader.ensure_region_loaded(&source, "lon_3"),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                loader.ensure_region_loaded(&source, "lon_2").await
            }
        );

        assert!(matches!(back.unwrap(), LoadOutcome::AlreadyResident(_)));
        assert!(matches!(stale.unwrap(), LoadOutcome::Superseded { .. }));
        assert_eq!(loader.resident_region().as_deref(), Some("lon_2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_request_joins_in_flight_fetch() {
        let loader = loader();
        let source = source().delay("lon_2", 500);

        let (first, repeat) = tokio::join!(
            loader.ensure_region_loaded(&source, "lon_2"),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                loader.ensure_region_loaded(&source, "lon_2").await
            }
        );

        assert!(matches!(first.unwrap(), LoadOutcome::Loaded(_)));
        assert!(matches!(repeat.unwrap(), LoadOutcome::InFlight { .. }));
        assert_eq!(loader.fetch_count(), 1);
        assert_eq!(loader.resident_region().as_deref(), Some("lon_2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_region_superseded_by_other_region() {
        let loader = loader();
        let source = source().delay("lon_2", 500).delay("lon_3", 10);

        // lon_2 is pending, lon_3 takes over, then lon_2 is asked for again
        let (first, other, again) = tokio::join!(
            loader.ensure_region_loaded(&source, "lon_2"),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                loader.ensure_region_loaded(&source, "lon_3").await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                loader.ensure_region_loaded(&source, "lon_2").await
            }
        );

        assert!(matches!(first.unwrap(), LoadOutcome::Superseded { .. }));
        assert!(matches!(other.unwrap(), LoadOutcome::Loaded(_)));
        assert!(matches!(again.unwrap(), LoadOutcome::Loaded(_)));
        assert_eq!(loader.fetch_count(), 3);
        assert_eq!(loader.resident_region().as_deref(), Some("lon_2"));
    }

    #[tokio::test]
    async fn test_partial_parse_is_reported() {
        let loader = loader();
        let body = format!("{}\n{{broken\n{}", line(130.41, "x"), line(130.42, "y"));
        let source = FakeSource::default().with("lon_2", body);

        let outcome = loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        let partition = outcome.partition().unwrap();
        assert_eq!(partition.features.len(), 2);
        assert_eq!(partition.errors.len(), 1);
        assert_eq!(partition.errors[0].line, 2);
    }

    #[tokio::test]
    async fn test_clear_drops_resident() {
        let loader = loader();
        let source = source();
        loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        loader.clear();
        assert!(loader.resident().is_none());
        loader.ensure_region_loaded(&source, "lon_2").await.unwrap();
        assert_eq!(loader.fetch_count(), 2);
    }
}
