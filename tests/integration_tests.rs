use riskzone::{
    DrawSurface, GeoPoint, HttpTileFetcher, RenderPhase, RiskMapConfig, RiskZoneMap, TileFetcher,
    TileIndex,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// End-to-end tests: a local tile server, the HTTP fetcher, the compositor
/// and the map state machine working together
#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Serves a solid PNG for every tile with `y >= 0` and 404 otherwise.
    /// Returns the base URL and a request counter.
    async fn spawn_tile_server(rgb: [u8; 3]) -> (String, Arc<AtomicUsize>) {
        let mut tile = DrawSurface::new(256, 256);
        tile.clear(rgb);
        let png = Arc::new(tile.to_png_bytes().unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let png = Arc::clone(&png);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    counter.fetch_add(1, Ordering::SeqCst);

                    // "GET /{z}/{x}/{y}.png HTTP/1.1"
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let negative_row = path.split('/').nth(3).map_or(false, |y| y.starts_with('-'));

                    let (status, body): (&str, &[u8]) = if negative_row {
                        ("404 Not Found", b"")
                    } else {
                        ("200 OK", png.as_slice())
                    };
                    let head = format!(
                        "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        status,
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(body).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config_for(base: &str) -> RiskMapConfig {
        init_logs();
        let mut config = RiskMapConfig::default();
        config.tiles.url_template = format!("{}/{{z}}/{{x}}/{{y}}.png", base);
        config.tiles.max_concurrent = 4;
        config.tiles.timeout_ms = 5_000;
        config
    }

    /// Full render over HTTP: every tile drawn, overlay on the midpoint
    #[tokio::test]
    async fn test_render_over_http() {
        let (base, hits) = spawn_tile_server([120, 180, 120]).await;
        let mut map = RiskZoneMap::from_config(config_for(&base)).unwrap();

        let report = map
            .set_view(GeoPoint::new(47.6062, -122.3321), 13)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(report.requested, 25);
        assert_eq!(report.drawn, 25);
        assert_eq!(report.failed, 0);
        assert!(report.overlay_drawn);
        assert_eq!(hits.load(Ordering::SeqCst), 25);
        assert_eq!(map.phase(), RenderPhase::Settled);

        let surface = map.surface();
        let surface = surface.lock().unwrap();
        assert_eq!(surface.pixel(400, 300), Some([220, 38, 38, 255]));
        assert_eq!(surface.pixel(799, 599), Some([120, 180, 120, 255]));
    }

    /// Tiles past the top edge of the world 404; their cells keep the
    /// background while the rest of the map and the overlay still draw
    #[tokio::test]
    async fn test_missing_tiles_leave_background() {
        let (base, _hits) = spawn_tile_server([120, 180, 120]).await;
        let config = config_for(&base);
        let background = config.style.background;
        let mut map = RiskZoneMap::from_config(config).unwrap();

        // Near the pole at zoom 2 the grid's top two rows are y = -2 and -1
        let report = map
            .set_view(GeoPoint::new(84.0, 0.0), 2)
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(report.failed, 10);
        assert_eq!(report.drawn, 15);
        assert!(report.overlay_drawn);

        // Row y = -1 spans roughly 12..268 px, row 0 starts below it
        let surface = map.surface();
        let surface = surface.lock().unwrap();
        let [r, g, b, _] = surface.pixel(799, 100).unwrap();
        assert_eq!([r, g, b], background);
        assert_eq!(surface.pixel(799, 400), Some([120, 180, 120, 255]));
    }

    /// The PNG written to disk matches the surface size
    #[tokio::test]
    async fn test_save_png_round_trips_through_disk() {
        let (base, _hits) = spawn_tile_server([10, 20, 30]).await;
        let mut config = config_for(&base);
        config.map.width = 320;
        config.map.height = 240;
        let mut map = RiskZoneMap::from_config(config).unwrap();

        map.set_view(GeoPoint::new(40.7128, -74.0060), 12)
            .unwrap()
            .wait()
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!("riskzone-{}.png", std::process::id()));
        map.save_png(&path).unwrap();

        let written = image::open(&path).unwrap().to_rgba8();
        std::fs::remove_file(&path).ok();
        assert_eq!(written.dimensions(), (320, 240));
        assert_eq!(written.get_pixel(160, 120).0, [220, 38, 38, 255]);
    }

    /// Rapid view changes over a real server: only the last one paints its
    /// overlay and owns the final phase
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rapid_view_changes_settle_on_latest() {
        let (base, _hits) = spawn_tile_server([200, 200, 200]).await;
        let mut map = RiskZoneMap::from_config(config_for(&base)).unwrap();

        let centers = [
            GeoPoint::new(47.6062, -122.3321),
            GeoPoint::new(40.7128, -74.0060),
            GeoPoint::new(41.8781, -87.6298),
        ];
        let handles: Vec<_> = centers
            .iter()
            .filter_map(|center| map.set_view(*center, 12))
            .collect();
        assert_eq!(handles.len(), 3);

        let mut reports = Vec::new();
        for handle in handles {
            reports.push(handle.wait().await.unwrap());
        }

        let last = reports.pop().unwrap();
        assert!(last.overlay_drawn);
        assert_eq!(last.drawn, last.requested);
        for superseded in &reports {
            assert!(!superseded.overlay_drawn);
            assert_eq!(
                superseded.drawn + superseded.failed + superseded.stale,
                superseded.requested
            );
        }
        assert_eq!(map.phase(), RenderPhase::Settled);
    }

    /// The HTTP fetcher builds tile URLs from the configured template
    #[tokio::test]
    async fn test_fetcher_uses_template() {
        let (base, hits) = spawn_tile_server([1, 1, 1]).await;
        let fetcher = HttpTileFetcher::from_config(&config_for(&base).tiles).unwrap();

        assert_eq!(
            fetcher.url(TileIndex::new(1309, 2857, 13)),
            format!("{}/13/1309/2857.png", base)
        );
        let bytes = fetcher.fetch(TileIndex::new(0, 0, 0)).await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
        assert!(fetcher.fetch(TileIndex::new(0, -1, 0)).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
