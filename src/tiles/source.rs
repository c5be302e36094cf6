use crate::core::config::TileLoadingConfig;
use crate::core::constants::OSM_TILE_TEMPLATE;
use crate::core::geo::TileIndex;

/// Maps a tile address to the URL serving it
pub trait TileSource: Send + Sync {
    fn url(&self, index: TileIndex) -> String;
}

/// URL pattern with `{z}`, `{x}`, `{y}` and optional `{s}` placeholders
#[derive(Debug, Clone)]
pub struct TemplateSource {
    template: String,
    subdomains: Vec<String>,
}

impl TemplateSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: Vec::new(),
        }
    }

    pub fn with_subdomains(mut self, subdomains: Vec<String>) -> Self {
        self.subdomains = subdomains;
        self
    }

    pub fn from_config(config: &TileLoadingConfig) -> Self {
        Self::new(config.url_template.clone()).with_subdomains(config.subdomains.clone())
    }

    fn subdomain(&self, index: &TileIndex) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let idx = (index.x + index.y).rem_euclid(self.subdomains.len() as i64) as usize;
        &self.subdomains[idx]
    }
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::new(OSM_TILE_TEMPLATE)
    }
}

impl TileSource for TemplateSource {
    fn url(&self, index: TileIndex) -> String {
        self.template
            .replace("{s}", self.subdomain(&index))
            .replace("{z}", &index.zoom.to_string())
            .replace("{x}", &index.x.to_string())
            .replace("{y}", &index.y.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_is_osm() {
        let url = TemplateSource::default().url(TileIndex::new(1309, 2857, 13));
        assert_eq!(url, "https://tile.openstreetmap.org/13/1309/2857.png");
    }

    #[test]
    fn test_config_template_without_subdomains() {
        let mut config = TileLoadingConfig::default();
        config.url_template = "http://localhost:8080/{z}/{x}/{y}.png".to_string();
        assert_eq!(
            TemplateSource::from_config(&config).url(TileIndex::new(5, 11, 5)),
            "http://localhost:8080/5/11/5.png"
        );
    }

    #[test]
    fn test_subdomains_rotate_by_position() {
        let source = TemplateSource::new("https://{s}.tiles.test/{z}/{x}/{y}.png")
            .with_subdomains(vec!["a".into(), "b".into(), "c".into()]);

        assert_eq!(
            source.url(TileIndex::new(0, 0, 2)),
            "https://a.tiles.test/2/0/0.png"
        );
        assert_eq!(
            source.url(TileIndex::new(1, 0, 2)),
            "https://b.tiles.test/2/1/0.png"
        );
        // Margin tiles west of the antimeridian still pick a subdomain
        assert_eq!(
            source.url(TileIndex::new(-1, 0, 2)),
            "https://c.tiles.test/2/-1/0.png"
        );
    }
}
