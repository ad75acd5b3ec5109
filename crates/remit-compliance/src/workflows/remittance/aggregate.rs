use tracing::{debug, warn};

use super::repository::{AggregateRefresher, LawyerDirectory, PageRequest};
use super::report::AggregateRefreshSummary;

/// Recompute outstanding fee totals for every lawyer in the directory.
///
/// Covers lawyers with nothing overdue as well, so a freshly settled balance drops to zero.
/// Failures are logged and counted, never returned.
pub fn refresh_all(
    directory: &dyn LawyerDirectory,
    refresher: &dyn AggregateRefresher,
    page_size: usize,
) -> AggregateRefreshSummary {
    let mut summary = AggregateRefreshSummary::default();
    let mut page = PageRequest::first(page_size.max(1));

    loop {
        let lawyer_ids = match directory.lawyer_ids(page) {
            Ok(ids) => ids,
            Err(error) => {
                warn!(offset = page.offset, %error, "aggregate refresh stopped: directory listing failed");
                break;
            }
        };
        let fetched = lawyer_ids.len();

        for lawyer_id in lawyer_ids {
            match refresher.recompute_outstanding(&lawyer_id) {
                Ok(total) => {
                    debug!(lawyer_id = %lawyer_id.0, %total, "outstanding fees recomputed");
                    summary.refreshed += 1;
                }
                Err(error) => {
                    warn!(lawyer_id = %lawyer_id.0, %error, "outstanding fee refresh failed");
                    summary.failed += 1;
                }
            }
        }

        if fetched < page.limit {
            break;
        }
        page = page.next();
    }

    summary
}
