//! Cache seeding for the five pre-seeded regions.
//!
//! Each region is fetched from the live directory page by page and written to
//! the cache under its region code. A region that fails is logged and skipped
//! so one bad region does not abort the run.

use std::time::Duration;

use dinewise_core::{Provenance, Region, RestaurantSummary};
use dinewise_db::NewCachedRestaurant;
use dinewise_yelp::{BusinessSearch, YelpClient, MAX_LIMIT, MAX_RESULT_WINDOW};

const SEED_TERM: &str = "restaurants";
const REGION_PAUSE: Duration = Duration::from_secs(1);

/// Totals printed at the end of a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SeedStats {
    pub fetched: usize,
    pub skipped_unreviewed: usize,
    pub inserted: u64,
    pub updated: u64,
    pub failed_regions: Vec<&'static str>,
}

/// Splits `limit` into `(offset, page_size)` requests of at most 50. The
/// directory serves nothing past its result window, so `limit` is capped there.
pub(crate) fn page_plan(limit: u32) -> Vec<(u32, u32)> {
    let limit = limit.min(MAX_RESULT_WINDOW);
    let mut pages = Vec::new();
    let mut offset = 0;
    while offset < limit {
        let size = (limit - offset).min(MAX_LIMIT);
        pages.push((offset, size));
        offset += size;
    }
    pages
}

/// Cache records for one region's results; unreviewed businesses are dropped.
pub(crate) fn seed_records(region: Region, results: &[RestaurantSummary]) -> Vec<NewCachedRestaurant> {
    results
        .iter()
        .filter(|r| r.review_count > 0)
        .map(|r| NewCachedRestaurant::from_summary(r, region.code(), Provenance::Seed))
        .collect()
}

async fn fetch_region(
    client: &YelpClient,
    region: Region,
    limit: u32,
) -> anyhow::Result<Vec<RestaurantSummary>> {
    let mut results = Vec::new();
    for (offset, size) in page_plan(limit) {
        let search = BusinessSearch {
            term: SEED_TERM.to_string(),
            location: Some(region.seed_location().to_string()),
            limit: size,
            offset,
            ..BusinessSearch::default()
        };
        let page = client.search_businesses(&search).await?;
        let returned = page.businesses.len();
        results.extend(page.businesses);

        // Short page: the directory has nothing more for this location.
        if returned < usize::try_from(size).unwrap_or(usize::MAX) {
            break;
        }
    }
    Ok(results)
}

/// Seeds `regions` sequentially, pausing between regions.
///
/// When `dry_run` is `true` results are fetched and counted but nothing is
/// written.
///
/// # Errors
///
/// Returns an error only if the directory client cannot be built. Region
/// failures are recorded in [`SeedStats::failed_regions`].
pub(crate) async fn run_seed(
    pool: &sqlx::PgPool,
    config: &dinewise_core::AppConfig,
    regions: &[Region],
    limit: u32,
    dry_run: bool,
) -> anyhow::Result<SeedStats> {
    let client = YelpClient::with_base_url(
        &config.yelp_api_key,
        config.yelp_timeout_secs,
        &config.yelp_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build Yelp client: {e}"))?;

    let mut stats = SeedStats::default();

    for (i, region) in regions.iter().copied().enumerate() {
        if i > 0 {
            tokio::time::sleep(REGION_PAUSE).await;
        }

        let results = match fetch_region(&client, region, limit).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "skipping region, fetch failed");
                stats.failed_regions.push(region.code());
                continue;
            }
        };

        let records = seed_records(region, &results);
        stats.fetched += results.len();
        stats.skipped_unreviewed += results.len() - records.len();

        if dry_run {
            println!(
                "dry-run: {region} would seed {} restaurants ({} fetched)",
                records.len(),
                results.len()
            );
            continue;
        }

        match dinewise_db::upsert_restaurants(pool, &records).await {
            Ok((inserted, updated)) => {
                tracing::info!(region = %region, inserted, updated, "region seeded");
                stats.inserted += inserted;
                stats.updated += updated;
            }
            Err(e) => {
                tracing::warn!(region = %region, error = %e, "skipping region, cache write failed");
                stats.failed_regions.push(region.code());
            }
        }
    }

    Ok(stats)
}

/// Parses `--region`, or every region when absent.
pub(crate) fn resolve_regions(raw: Option<&str>) -> anyhow::Result<Vec<Region>> {
    match raw {
        Some(code) => {
            let region = code
                .parse::<Region>()
                .map_err(|e| anyhow::anyhow!("{e}; expected one of MAN, BK, QN, BX, SI"))?;
            Ok(vec![region])
        }
        None => Ok(Region::ALL.to_vec()),
    }
}

pub(crate) fn print_summary(stats: &SeedStats, dry_run: bool) {
    let mode = if dry_run { " (dry-run)" } else { "" };
    println!(
        "seed complete{mode}: {} fetched, {} skipped without reviews, {} inserted, {} updated",
        stats.fetched, stats.skipped_unreviewed, stats.inserted, stats.updated
    );
    if !stats.failed_regions.is_empty() {
        eprintln!("warning: failed regions: {}", stats.failed_regions.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, review_count: i32) -> RestaurantSummary {
        RestaurantSummary {
            id: id.to_string(),
            name: id.to_string(),
            rating: 4.0,
            review_count,
            price: None,
            categories: vec!["pizza".to_string()],
            image_url: None,
            distance: None,
            is_open: true,
            address: None,
            phone: None,
            yelp_url: None,
            coordinates: None,
        }
    }

    #[test]
    fn page_plan_splits_into_fifties() {
        assert_eq!(page_plan(100), vec![(0, 50), (50, 50)]);
        assert_eq!(page_plan(120), vec![(0, 50), (50, 50), (100, 20)]);
        assert_eq!(page_plan(7), vec![(0, 7)]);
        assert!(page_plan(0).is_empty());
    }

    #[test]
    fn page_plan_stops_at_the_result_window() {
        let pages = page_plan(5_000);
        assert_eq!(pages.len(), 20);
        assert_eq!(pages.last(), Some(&(950, 50)));
        assert!(pages.iter().all(|(offset, size)| offset + size <= MAX_RESULT_WINDOW));
    }

    #[test]
    fn seed_records_tag_region_and_skip_unreviewed() {
        let records = seed_records(Region::Queens, &[result("a", 10), result("b", 0)]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location_code, "QN");
        assert_eq!(records[0].provenance, Provenance::Seed);
    }

    #[test]
    fn resolve_regions_accepts_codes_case_insensitively() {
        assert_eq!(resolve_regions(Some("si")).expect("valid"), vec![Region::StatenIsland]);
        assert_eq!(resolve_regions(None).expect("all").len(), 5);
        assert!(resolve_regions(Some("NYC")).is_err());
    }
}
