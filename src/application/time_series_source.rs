// Port for the remote time-series and statistics reads
use crate::domain::identity::SessionIdentity;
use crate::domain::resolution::Resolution;
use crate::domain::sample::Sample;
use crate::domain::stats::StatsSnapshot;
use async_trait::async_trait;
use chrono::NaiveDateTime;

#[async_trait]
pub trait TimeSeriesSource: Send + Sync {
    /// Ordered window of samples at `resolution`.
    ///
    /// Without `after` the source returns the start of the stream; with it, the
    /// window ends at the first sample strictly after `after`, or at the last
    /// recorded sample when history is exhausted.
    async fn fetch_window(
        &self,
        identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> anyhow::Result<Vec<Sample>>;

    /// Summary metrics over the same window
    async fn fetch_stats(
        &self,
        identity: &SessionIdentity,
        resolution: Resolution,
        after: Option<NaiveDateTime>,
    ) -> anyhow::Result<StatsSnapshot>;
}
