use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of threads requested for a job: an exact count (`8`) or a range the scheduler may pick
/// from (`4-8`)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NumThreads {
    Exact(u32),
    Range(u32, u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid thread count {0:?}, expected a number (8) or a range (4-8)")]
pub struct ParseThreadsError(String);

impl NumThreads {
    /// Upper bound of the request
    pub fn max(&self) -> u32 {
        match self {
            NumThreads::Exact(n) => *n,
            NumThreads::Range(_, hi) => *hi,
        }
    }
}

impl Default for NumThreads {
    fn default() -> Self {
        NumThreads::Exact(1)
    }
}

impl FromStr for NumThreads {
    type Err = ParseThreadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseThreadsError(s.to_string());
        let count = |part: &str| part.trim().parse::<u32>().ok().filter(|n| *n > 0);

        match s.split_once('-') {
            None => count(s).map(NumThreads::Exact).ok_or_else(err),
            Some((lo, hi)) => match (count(lo), count(hi)) {
                (Some(lo), Some(hi)) if lo <= hi => Ok(NumThreads::Range(lo, hi)),
                _ => Err(err()),
            },
        }
    }
}

impl fmt::Display for NumThreads {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NumThreads::Exact(n) => write!(f, "{n}"),
            NumThreads::Range(lo, hi) => write!(f, "{lo}-{hi}"),
        }
    }
}
