use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::catalog::{self, Catalog};
use crate::error::{Result, RotapaperError};
use crate::protocol::ProtocolClient;
use crate::scheduler::Cycle;
use crate::selector::Selector;

/// Time hyprpaper needs to switch images before the old data can go.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationOptions {
    pub keep_loaded: bool,
    pub consistent: bool,
    pub recursive: bool,
    /// Re-scan the directories at the start of every cycle.
    pub rescan: bool,
}

/// Where the catalog came from, kept around for re-scans.
#[derive(Debug, Clone, Default)]
pub struct CatalogSource {
    pub roots: Vec<PathBuf>,
    pub extensions: Vec<String>,
}

impl CatalogSource {
    pub fn new(roots: Vec<PathBuf>, extra_extensions: &[String]) -> Self {
        Self {
            roots,
            extensions: catalog::extensions_with(extra_extensions),
        }
    }

    pub fn scan(&self, recursive: bool) -> Result<Catalog> {
        Catalog::build(&self.roots, &self.extensions, recursive)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    QueryingActive,
    Selecting,
    Preloading,
    Assigning,
    Settling,
    Unloading,
}

impl std::fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::QueryingActive => write!(f, "querying_active"),
            Self::Selecting => write!(f, "selecting"),
            Self::Preloading => write!(f, "preloading"),
            Self::Assigning => write!(f, "assigning"),
            Self::Settling => write!(f, "settling"),
            Self::Unloading => write!(f, "unloading"),
        }
    }
}

/// Everything a rotation needs to remember between and within cycles.
#[derive(Debug, Clone)]
pub struct RotationState {
    pub catalog: Catalog,
    pub source: CatalogSource,
    pub options: RotationOptions,
    /// Wallpapers on screen as of the last `listactive`.
    active: HashSet<PathBuf>,
    /// Wallpapers picked during the running cycle, in pick order.
    used: Vec<PathBuf>,
}

impl RotationState {
    pub fn new(catalog: Catalog, source: CatalogSource, options: RotationOptions) -> Self {
        Self {
            catalog,
            source,
            options,
            active: HashSet::new(),
            used: Vec::new(),
        }
    }

    pub fn active(&self) -> &HashSet<PathBuf> {
        &self.active
    }

    pub fn used(&self) -> &[PathBuf] {
        &self.used
    }

    fn excluded(&self) -> HashSet<PathBuf> {
        self.active.iter().chain(self.used.iter()).cloned().collect()
    }

    fn mark_used(&mut self, path: PathBuf) {
        if !self.used.contains(&path) {
            self.used.push(path);
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub assignments: Vec<(String, PathBuf)>,
    pub preloaded: Vec<PathBuf>,
    pub unloaded: Vec<PathBuf>,
}

pub struct RotationController<R: Rng = StdRng> {
    client: ProtocolClient,
    state: RotationState,
    selector: Selector<R>,
    monitors: Vec<String>,
    settle_delay: Duration,
    phase: CyclePhase,
}

impl RotationController<StdRng> {
    pub fn new(client: ProtocolClient, state: RotationState, monitors: Vec<String>) -> Result<Self> {
        Self::with_selector(client, state, monitors, Selector::new())
    }
}

impl<R: Rng> RotationController<R> {
    pub fn with_selector(
        client: ProtocolClient,
        state: RotationState,
        monitors: Vec<String>,
        selector: Selector<R>,
    ) -> Result<Self> {
        if state.catalog.is_empty() {
            return Err(RotapaperError::EmptyCatalog);
        }
        Ok(Self {
            client,
            state,
            selector,
            monitors,
            settle_delay: SETTLE_DELAY,
            phase: CyclePhase::Idle,
        })
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Run one full rotation. The used set is cleared whether or not the
    /// cycle succeeds; commands already sent are never rolled back.
    pub async fn cycle(&mut self) -> Result<CycleReport> {
        let result = self.run_phases().await;
        self.state.used.clear();
        enter(&mut self.phase, CyclePhase::Idle);
        result
    }

    async fn run_phases(&mut self) -> Result<CycleReport> {
        if self.state.options.rescan {
            self.state.catalog = self.state.source.scan(self.state.options.recursive)?;
        }

        enter(&mut self.phase, CyclePhase::QueryingActive);
        let active = self.client.list_active().await?;
        self.state.active = active.into_iter().map(|a| a.path).collect();

        let mut report = CycleReport::default();
        let mut consistent_pick: Option<PathBuf> = None;

        for monitor in &self.monitors {
            enter(&mut self.phase, CyclePhase::Selecting);
            let path = self.selector.pick(
                &self.state.catalog,
                &self.state.excluded(),
                self.state.options.consistent,
                consistent_pick.as_ref(),
            )?;
            if self.state.options.consistent {
                consistent_pick = Some(path.clone());
            }

            if !report.preloaded.contains(&path) {
                enter(&mut self.phase, CyclePhase::Preloading);
                self.client.preload(&path).await?;
                report.preloaded.push(path.clone());
            }

            enter(&mut self.phase, CyclePhase::Assigning);
            self.client.assign(monitor, &path).await?;
            info!(%monitor, path = %path.display(), "wallpaper assigned");
            self.state.mark_used(path.clone());
            report.assignments.push((monitor.clone(), path));
        }

        if self.state.options.keep_loaded {
            return Ok(report);
        }

        if self.monitors.len() > 1 {
            enter(&mut self.phase, CyclePhase::Settling);
            tokio::time::sleep(self.settle_delay).await;
        }

        enter(&mut self.phase, CyclePhase::Unloading);
        let loaded: HashSet<PathBuf> = self.client.list_loaded().await?.into_iter().collect();
        for path in &self.state.used {
            if !loaded.contains(path) {
                debug!(path = %path.display(), "not loaded, skipping unload");
                continue;
            }
            self.client.unload(path).await?;
            report.unloaded.push(path.clone());
        }

        Ok(report)
    }
}

fn enter(current: &mut CyclePhase, phase: CyclePhase) {
    debug!(from = %current, to = %phase, "cycle phase");
    *current = phase;
}

#[async_trait]
impl<R: Rng + Send> Cycle for RotationController<R> {
    async fn run_cycle(&mut self) -> Result<()> {
        let report = self.cycle().await?;
        info!(
            assigned = report.assignments.len(),
            unloaded = report.unloaded.len(),
            "rotation cycle complete"
        );
        Ok(())
    }
}
