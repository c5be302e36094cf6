//! Tile compositor: fetches the tiles around a viewport, draws each one as it
//! arrives, and draws the overlay once every tile has settled.
//!
//! Every render runs under a generation number taken from a monotonically
//! increasing counter. Tile tasks capture it at dispatch and compare it with
//! the current one before drawing, so a render that has been superseded
//! stops painting instead of racing the newer one.

use crate::core::config::{RiskMapConfig, StyleConfig};
use crate::core::geo::TileIndex;
use crate::core::viewport::Viewport;
use crate::rendering::overlay::Overlay;
use crate::rendering::surface::{decode_tile, SharedSurface};
use crate::tiles::barrier::SettleBarrier;
use crate::tiles::loader::TileFetcher;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Outcome of one render generation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub generation: u64,
    /// Tiles dispatched
    pub requested: usize,
    /// Tiles painted onto the surface
    pub drawn: usize,
    /// Tiles whose fetch or decode failed; their cells keep the background
    pub failed: usize,
    /// Tiles dropped because a newer generation had started
    pub stale: usize,
    pub overlay_drawn: bool,
}

/// Hooks for following a render as it progresses
pub trait RenderObserver: Send + Sync {
    /// A tile of `generation` has just been painted
    fn tile_drawn(&self, _generation: u64, _index: TileIndex) {}

    /// Every tile of the generation has settled and the overlay step ran
    fn settled(&self, _report: &RenderReport) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl RenderObserver for NoopObserver {}

#[derive(Debug, Default)]
struct TileCounters {
    drawn: AtomicUsize,
    failed: AtomicUsize,
    stale: AtomicUsize,
}

pub struct TileCompositor {
    fetcher: Arc<dyn TileFetcher>,
    style: StyleConfig,
    limiter: Arc<Semaphore>,
    generation: Arc<AtomicU64>,
}

impl TileCompositor {
    pub fn new(fetcher: Arc<dyn TileFetcher>, config: &RiskMapConfig) -> Self {
        Self {
            fetcher,
            style: config.style.clone(),
            limiter: Arc::new(Semaphore::new(config.tiles.max_concurrent.max(1))),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Generation that is currently allowed to paint
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Supersedes every earlier generation and returns the new one
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts a fresh generation and renders it to completion
    pub async fn render(
        &self,
        surface: SharedSurface,
        viewport: &Viewport,
        overlay: Option<Overlay>,
    ) -> RenderReport {
        let generation = self.next_generation();
        self.render_generation(generation, surface, viewport, overlay, Arc::new(NoopObserver))
            .await
    }

    /// Renders under an already allocated generation number
    pub async fn render_generation(
        &self,
        generation: u64,
        surface: SharedSurface,
        viewport: &Viewport,
        overlay: Option<Overlay>,
        observer: Arc<dyn RenderObserver>,
    ) -> RenderReport {
        let grid = viewport.tile_grid();
        let counters = Arc::new(TileCounters::default());

        if let Ok(mut surface) = surface.lock() {
            if self.is_current(generation) {
                surface.clear(self.style.background);
            }
        }

        log::debug!(
            "generation {} dispatching {} tiles from {:?}",
            generation,
            grid.len(),
            grid.origin
        );

        let barrier = SettleBarrier::new();
        for index in grid.tiles() {
            let ticket = barrier.ticket();
            let fetcher = Arc::clone(&self.fetcher);
            let limiter = Arc::clone(&self.limiter);
            let current = Arc::clone(&self.generation);
            let counters = Arc::clone(&counters);
            let observer = Arc::clone(&observer);
            let surface = Arc::clone(&surface);
            let position = viewport.tile_screen_position(&index).round();

            tokio::spawn(async move {
                let _ticket = ticket;
                let _permit = limiter.acquire_owned().await.ok();

                if current.load(Ordering::SeqCst) != generation {
                    counters.stale.fetch_add(1, Ordering::SeqCst);
                    return;
                }

                let tile = match fetcher.fetch(index).await.and_then(|bytes| decode_tile(&bytes)) {
                    Ok(tile) => tile,
                    Err(e) => {
                        log::warn!("tile {:?} skipped: {}", index, e);
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                };

                let drawn = match surface.lock() {
                    // Checked under the lock so a newer clear cannot interleave
                    Ok(mut surface) if current.load(Ordering::SeqCst) == generation => {
                        surface.draw_image(&tile, position.0, position.1);
                        true
                    }
                    Ok(_) => {
                        counters.stale.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    Err(_) => false,
                };

                if drawn {
                    counters.drawn.fetch_add(1, Ordering::SeqCst);
                    observer.tile_drawn(generation, index);
                } else {
                    log::warn!("tile {:?} skipped: surface lock poisoned", index);
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        barrier.wait().await;

        let overlay_drawn = match surface.lock() {
            Ok(mut surface) if self.is_current(generation) => {
                if let Some(overlay) = overlay {
                    overlay.draw(&mut surface, viewport, &self.style);
                }
                true
            }
            _ => false,
        };

        let report = RenderReport {
            generation,
            requested: grid.len(),
            drawn: counters.drawn.load(Ordering::SeqCst),
            failed: counters.failed.load(Ordering::SeqCst),
            stale: counters.stale.load(Ordering::SeqCst),
            overlay_drawn,
        };

        if overlay_drawn {
            log::info!(
                "generation {} settled: {}/{} tiles drawn, {} failed",
                generation,
                report.drawn,
                report.requested,
                report.failed
            );
        } else {
            log::debug!(
                "generation {} superseded: {} drawn, {} stale",
                generation,
                report.drawn,
                report.stale
            );
        }

        observer.settled(&report);
        report
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }
}
