use crate::parallel::{CpuFlag, Parallel};

/// A named scheduler resource class
///
/// The same queue name appears once per parallel environment it supports.
#[derive(Debug, PartialEq, Eq)]
pub struct Queue {
    pub name: &'static str,
    pub parallel: Parallel,
    pub cpus: u32,
    pub memory_gb: u32,
    pub max_days: u32,
    pub flags: &'static [CpuFlag],
}

// 76 x Lenovo NeXtScale nx360 M5, 2 x Intel Xeon E5-2683 v3, 128 GB RAM
pub static QUEUES: &[Queue] = &[
    Queue { name: "p28.q", parallel: Parallel::Single, cpus: 1, memory_gb: 128, max_days: 7, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28.q", parallel: Parallel::Threads, cpus: 28, memory_gb: 128, max_days: 7, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28.q", parallel: Parallel::Mpi, cpus: 28, memory_gb: 128, max_days: 7, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28.q", parallel: Parallel::MpiFull, cpus: 28, memory_gb: 128, max_days: 7, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28-long.q", parallel: Parallel::Single, cpus: 28, memory_gb: 128, max_days: 30, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28-long.q", parallel: Parallel::Threads, cpus: 28, memory_gb: 128, max_days: 30, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28-long.q", parallel: Parallel::Mpi, cpus: 28, memory_gb: 128, max_days: 30, flags: &[CpuFlag::Avx2] },
    Queue { name: "p28-long.q", parallel: Parallel::MpiFull, cpus: 28, memory_gb: 128, max_days: 30, flags: &[CpuFlag::Avx2] },
];

/// First queue offering `parallel` whose nodes support every flag in `flags`
pub fn find_queue(parallel: Parallel, flags: &[CpuFlag]) -> Option<&'static Queue> {
    find_queue_in(QUEUES, parallel, flags)
}

pub(crate) fn find_queue_in<'a>(queues: &'a [Queue], parallel: Parallel, flags: &[CpuFlag]) -> Option<&'a Queue> {
    queues
        .iter()
        .find(|q| q.parallel == parallel && flags.iter().all(|f| q.flags.contains(f)))
}
