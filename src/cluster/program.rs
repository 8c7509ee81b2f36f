use std::path::{Path, PathBuf};

use crate::parallel::{CpuFlag, Parallel};

/// An installed build of a program
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    pub executable: &'static str,
    /// install directory, relative to the programs root
    pub directory: &'static str,
    pub parallel: Parallel,
    pub flags: &'static [CpuFlag],
    /// environment modules loaded before running
    pub modules: &'static [&'static str],
}

impl Program {
    pub fn install_dir(&self, programs_root: &Path) -> PathBuf {
        programs_root.join(self.directory)
    }
}

/// Catalog of installed programs keyed by logical program name
pub static PROGRAMS: &[(&str, &[Program])] = &[
    ("raxml", &[
        Program { executable: "raxmlHPC-AVX2", directory: "RAxML/bin", parallel: Parallel::Single, flags: &[CpuFlag::Avx2], modules: &[] },
        Program { executable: "raxmlHPC-PTHREADS-AVX2", directory: "RAxML/bin", parallel: Parallel::Threads, flags: &[CpuFlag::Avx2], modules: &[] },
    ]),
    ("mrbayes", &[
        Program { executable: "mb", directory: "MrBayes/bin", parallel: Parallel::Single, flags: &[], modules: &["beagle"] },
    ]),
];

/// First build of `name` with the requested parallel mode
pub fn find_program(name: &str, parallel: Parallel) -> Option<&'static Program> {
    PROGRAMS
        .iter()
        .filter(|(n, _)| *n == name)
        .flat_map(|(_, builds)| builds.iter())
        .find(|p| p.parallel == parallel)
}
