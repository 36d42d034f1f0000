// Domain models: snapshots, rollup rows, node profile, series

mod metric;
mod profile;
mod rollup;
mod snapshot;
mod statistics;

pub use metric::{lenient_f64, parse_metric};
pub use profile::{NodeProfile, ProfileDelta, ProfitWindowSet, WindowSum};
pub use rollup::{DailyRecord, HourlyRecord};
pub use snapshot::RuntimeSnapshot;
pub use statistics::{DailyStatistic, IncomePoint};
