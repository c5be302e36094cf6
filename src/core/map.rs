use crate::{
    core::{
        config::RiskMapConfig,
        constants::MAX_ZOOM,
        geo::{GeoPoint, TileIndex},
        viewport::Viewport,
    },
    rendering::{
        compositor::{RenderObserver, RenderReport, TileCompositor},
        overlay::Overlay,
        surface::{DrawSurface, SharedSurface},
    },
    tiles::loader::{HttpTileFetcher, TileFetcher},
    MapError, Result,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Where the active render currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPhase {
    #[default]
    Idle,
    /// Tiles requested, none drawn yet
    Fetching,
    /// At least one tile drawn, others still outstanding
    Compositing,
    /// Every tile settled and the overlay is on top
    Settled,
}

/// Phase plus the generation allowed to advance it
#[derive(Debug, Default)]
struct PhaseState {
    generation: u64,
    phase: RenderPhase,
}

/// Moves the phase for the generation that owns it and ignores the rest
#[derive(Debug, Default)]
struct PhaseTracker {
    state: Mutex<PhaseState>,
}

impl PhaseTracker {
    fn start(&self, generation: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.generation = generation;
            state.phase = RenderPhase::Fetching;
        }
    }

    fn phase(&self) -> RenderPhase {
        self.state
            .lock()
            .map(|state| state.phase)
            .unwrap_or_default()
    }
}

impl RenderObserver for PhaseTracker {
    fn tile_drawn(&self, generation: u64, _index: TileIndex) {
        if let Ok(mut state) = self.state.lock() {
            if state.generation == generation && state.phase == RenderPhase::Fetching {
                state.phase = RenderPhase::Compositing;
            }
        }
    }

    fn settled(&self, report: &RenderReport) {
        if !report.overlay_drawn {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            if state.generation == report.generation {
                state.phase = RenderPhase::Settled;
            }
        }
    }
}

/// A render running in the background
#[derive(Debug)]
pub struct RenderHandle {
    generation: u64,
    join: JoinHandle<RenderReport>,
}

impl RenderHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves once every tile of this render settled
    pub async fn wait(self) -> Result<RenderReport> {
        self.join
            .await
            .map_err(|e| MapError::Render(format!("render task failed: {}", e)))
    }
}

/// Renders the basemap around a location with a risk disc on top.
///
/// Each change of view starts a new render; an older render still in flight
/// keeps running but can no longer paint.
pub struct RiskZoneMap {
    config: RiskMapConfig,
    compositor: Arc<TileCompositor>,
    surface: SharedSurface,
    tracker: Arc<PhaseTracker>,
    view: Option<(GeoPoint, u8)>,
    radius_meters: f64,
}

impl RiskZoneMap {
    pub fn new(config: RiskMapConfig, fetcher: Arc<dyn TileFetcher>) -> Self {
        let surface = DrawSurface::shared(config.map.width, config.map.height);
        Self {
            compositor: Arc::new(TileCompositor::new(fetcher, &config)),
            surface,
            tracker: Arc::new(PhaseTracker::default()),
            view: None,
            radius_meters: config.map.radius_meters,
            config,
        }
    }

    /// Validates the config and fetches tiles over HTTP
    pub fn from_config(config: RiskMapConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpTileFetcher::from_config(&config.tiles)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    /// Points the map at `center`. Returns `None` when the view is unchanged.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_view(&mut self, center: GeoPoint, zoom: u8) -> Option<RenderHandle> {
        let zoom = if zoom > MAX_ZOOM {
            log::warn!("zoom {} above {}, clamping", zoom, MAX_ZOOM);
            MAX_ZOOM
        } else {
            zoom
        };

        if self.view == Some((center, zoom)) {
            log::debug!("view unchanged at {:?} z{}, skipping redraw", center, zoom);
            return None;
        }

        self.view = Some((center, zoom));
        Some(self.spawn_render(center, zoom))
    }

    /// Re-renders the current view, e.g. after [`set_radius`](Self::set_radius)
    pub fn redraw(&mut self) -> Option<RenderHandle> {
        let (center, zoom) = self.view?;
        Some(self.spawn_render(center, zoom))
    }

    /// Overlay radius used from the next render on
    pub fn set_radius(&mut self, meters: f64) {
        self.radius_meters = meters;
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn phase(&self) -> RenderPhase {
        self.tracker.phase()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.view.map(|(center, zoom)| self.viewport_for(center, zoom))
    }

    pub fn config(&self) -> &RiskMapConfig {
        &self.config
    }

    pub fn surface(&self) -> SharedSurface {
        Arc::clone(&self.surface)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let surface = self
            .surface
            .lock()
            .map_err(|_| MapError::Render("surface lock poisoned".to_string()))?;
        surface.save_png(path)
    }

    fn viewport_for(&self, center: GeoPoint, zoom: u8) -> Viewport {
        Viewport::new(center, zoom, self.config.map.width, self.config.map.height)
            .with_tile_size(self.config.map.tile_size)
    }

    fn spawn_render(&self, center: GeoPoint, zoom: u8) -> RenderHandle {
        let viewport = self.viewport_for(center, zoom);
        let overlay = Overlay::new(center, self.radius_meters);
        let generation = self.compositor.next_generation();
        self.tracker.start(generation);

        log::info!(
            "render {} at ({:.4}, {:.4}) z{}",
            generation,
            center.lat,
            center.lng,
            zoom
        );

        let compositor = Arc::clone(&self.compositor);
        let surface = Arc::clone(&self.surface);
        let observer: Arc<dyn RenderObserver> = self.tracker.clone();
        let join = tokio::spawn(async move {
            compositor
                .render_generation(generation, surface, &viewport, Some(overlay), observer)
                .await
        });

        RenderHandle { generation, join }
    }
}
