use log::info;

use crate::cluster::program::{find_program, Program};
use crate::cluster::queue::{find_queue, Queue};
use crate::parallel::Parallel;

/// A program build paired with the queue it will be submitted to
#[derive(Debug, PartialEq, Eq)]
pub struct Resolution {
    pub program: &'static Program,
    pub queue: &'static Queue,
}

impl Resolution {
    /// True when the job will get more than one slot to run threads on
    pub fn is_threaded(&self, max_threads: u32) -> bool {
        self.program.parallel == Parallel::Threads
            && self.queue.parallel == Parallel::Threads
            && max_threads > 1
    }
}

/// Pick a program build and queue
///
/// Tried in order, first hit wins:
/// 1. threaded build on a threads queue (only when more than one thread is requested)
/// 2. single CPU build on a single queue
/// 3. threaded build on a single queue
pub fn resolve(name: &str, max_threads: u32, has_single: bool, has_threads: bool) -> Option<Resolution> {
    let threaded = || pair(name, Parallel::Threads, Parallel::Threads);
    let single = || pair(name, Parallel::Single, Parallel::Single);
    let threaded_on_single = || pair(name, Parallel::Threads, Parallel::Single);

    let resolution = (max_threads > 1 && has_threads)
        .then(threaded)
        .flatten()
        .or_else(|| has_single.then(single).flatten())
        .or_else(|| has_threads.then(threaded_on_single).flatten());

    if let Some(r) = &resolution {
        info!("Resolved {name} to {} ({}) on queue {} ({})", r.program.executable, r.program.parallel, r.queue.name, r.queue.parallel);
    }
    resolution
}

fn pair(name: &str, program_mode: Parallel, queue_mode: Parallel) -> Option<Resolution> {
    let program = find_program(name, program_mode)?;
    let queue = find_queue(queue_mode, program.flags)?;
    Some(Resolution { program, queue })
}
