use std::fmt;

/// How a program (or a queue slot) uses the CPUs it is given
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Parallel {
    Single,
    Threads,
    Mpi,
    MpiFull,
}

impl fmt::Display for Parallel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Parallel::Single => write!(f, "single"),
            Parallel::Threads => write!(f, "threads"),
            Parallel::Mpi => write!(f, "mpi"),
            Parallel::MpiFull => write!(f, "mpifull"),
        }
    }
}

/// Vector instruction sets a node must support to run a binary
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CpuFlag {
    Avx,
    Avx2,
}

impl fmt::Display for CpuFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CpuFlag::Avx => write!(f, "AVX"),
            CpuFlag::Avx2 => write!(f, "AVX2"),
        }
    }
}
