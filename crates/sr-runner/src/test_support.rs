use crate::campaign::{ArtifactStore, CommandRunner, EngineStatus};
use crate::invocation::{Invocation, SeedSource};
use crate::layout::CampaignLayout;
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Files = Rc<RefCell<BTreeSet<PathBuf>>>;

/// Seed source for reproducible runs; drawing from it is a bug.
pub(crate) struct NoSeeds;

impl SeedSource for NoSeeds {
    fn next_seed(&mut self) -> u64 {
        panic!("reproducible mode must not draw a seed")
    }
}

pub(crate) struct SequenceSeeds(VecDeque<u64>);

impl SequenceSeeds {
    pub(crate) fn new(seeds: impl IntoIterator<Item = u64>) -> Self {
        Self(seeds.into_iter().collect())
    }
}

impl SeedSource for SequenceSeeds {
    fn next_seed(&mut self) -> u64 {
        self.0.pop_front().expect("seed sequence exhausted")
    }
}

/// In-memory statistics directory.
#[derive(Default)]
pub(crate) struct MemoryStore {
    files: Files,
    failing: BTreeSet<PathBuf>,
}

impl MemoryStore {
    pub(crate) fn files(&self) -> Files {
        Rc::clone(&self.files)
    }

    /// Renames onto `to` fail from now on.
    pub(crate) fn fail_on(&mut self, to: PathBuf) {
        self.failing.insert(to);
    }

    pub(crate) fn snapshot(&self) -> BTreeSet<PathBuf> {
        self.files.borrow().clone()
    }
}

impl ArtifactStore for MemoryStore {
    fn rename_if_exists(&mut self, from: &Path, to: &Path) -> Result<bool> {
        let mut files = self.files.borrow_mut();
        if !files.contains(from) {
            return Ok(false);
        }
        if self.failing.contains(to) {
            return Err(anyhow!("permission denied: {}", to.display()));
        }
        files.remove(from);
        files.insert(to.to_path_buf());
        Ok(true)
    }
}

/// Stands in for the engine: records invocations and drops output files into
/// the shared in-memory statistics directory.
pub(crate) struct FakeEngine {
    files: Files,
    stat_dir: PathBuf,
    statuses: VecDeque<EngineStatus>,
    pending_outputs: Vec<&'static str>,
    invocations: Vec<Invocation>,
}

impl FakeEngine {
    pub(crate) fn new(files: Files) -> Self {
        Self {
            files,
            stat_dir: CampaignLayout::default().stat_dir,
            statuses: VecDeque::new(),
            pending_outputs: Vec::new(),
            invocations: Vec::new(),
        }
    }

    /// Status of the next run that has not been assigned one yet; unassigned
    /// runs succeed.
    pub(crate) fn push_status(&mut self, status: EngineStatus) {
        self.statuses.push_back(status);
    }

    pub(crate) fn produce_on_next_run(&mut self, outputs: &[&'static str]) {
        self.pending_outputs.extend_from_slice(outputs);
    }

    pub(crate) fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }
}

impl CommandRunner for FakeEngine {
    fn execute(&mut self, invocation: &Invocation) -> EngineStatus {
        self.invocations.push(invocation.clone());
        let mut files = self.files.borrow_mut();
        for name in self.pending_outputs.drain(..) {
            files.insert(self.stat_dir.join(name));
        }
        self.statuses.pop_front().unwrap_or(EngineStatus::Succeeded)
    }
}
