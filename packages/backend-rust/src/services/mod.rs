pub mod calibration;
pub mod practice;

use masterly_algo::{LowestIdTieBreaker, RandomTieBreaker, TieBreaker};

use crate::config::TieBreakMode;

pub(crate) const MS_PER_HOUR: i64 = 60 * 60 * 1000;
pub(crate) const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Fresh tie-breaker for one selection.
pub(crate) fn tie_breaker(mode: TieBreakMode) -> Box<dyn TieBreaker + Send> {
    match mode {
        TieBreakMode::Random => Box::new(RandomTieBreaker::from_entropy()),
        TieBreakMode::LowestId => Box::new(LowestIdTieBreaker),
    }
}

/// SQLITE_BUSY and its extended codes, which a retry can clear.
pub(crate) fn is_busy(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xff == 5 || code & 0xff == 6)
        .unwrap_or(false)
}
