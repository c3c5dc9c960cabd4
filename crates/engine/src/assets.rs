use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::sprite_keys::{AssetCategory, SpriteKey, SpriteKeyError};

const PLACEHOLDER_COLOR: [u8; 4] = [220, 220, 240, 255];
const PLACEHOLDER_GRASS_COLOR: [u8; 4] = [74, 112, 56, 255];
const PLACEHOLDER_DIRT_COLOR: [u8; 4] = [112, 83, 58, 255];
const PLACEHOLDER_ROCK_COLOR: [u8; 4] = [108, 108, 116, 255];
const PLACEHOLDER_SAND_COLOR: [u8; 4] = [206, 186, 128, 255];
const PLACEHOLDER_WATER_COLOR: [u8; 4] = [48, 92, 156, 255];
const PLACEHOLDER_PLAYER_COLOR: [u8; 4] = [230, 200, 90, 255];
const PLACEHOLDER_ANIMAL_COLOR: [u8; 4] = [190, 130, 90, 255];
const PLACEHOLDER_PROP_COLOR: [u8; 4] = [60, 150, 80, 255];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid sprite key: {0}")]
    InvalidKey(#[from] SpriteKeyError),
    #[error("asset {key} not found")]
    NotFound { key: String },
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sheet {key} is {width}px wide, narrower than one {frame_width}px frame")]
    SheetTooNarrow {
        key: String,
        width: u32,
        frame_width: u32,
    },
}

/// Decoded RGBA8 pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Surface {
    /// Returns `None` when `rgba` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (rgba.len() == expected).then_some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            rgba: color.repeat(width as usize * height as usize),
        }
    }

    /// Solid isometric diamond inscribed in a `width` x `height` box, transparent elsewhere.
    pub fn diamond(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut surface = Self::filled(width, height, [0, 0, 0, 0]);
        let half_w = surface.width as f32 / 2.0;
        let half_h = surface.height as f32 / 2.0;
        for y in 0..surface.height {
            for x in 0..surface.width {
                let dx = ((x as f32 + 0.5) - half_w).abs() / half_w;
                let dy = ((y as f32 + 0.5) - half_h).abs() / half_h;
                if dx + dy <= 1.0 {
                    surface.put(x, y, color);
                }
            }
        }
        surface
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let bytes = self.rgba.get(offset..offset + 4)?;
        Some([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn put(&mut self, x: u32, y: u32, color: [u8; 4]) {
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(bytes) = self.rgba.get_mut(offset..offset + 4) {
            bytes.copy_from_slice(&color);
        }
    }
}

/// Index of a surface owned by an [`AssetCatalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(usize);

/// Raw loader behind the catalog.
pub trait SurfaceSource {
    fn load(&self, key: &SpriteKey) -> Result<Surface, AssetError>;
}

/// Reads `<root>/sprites/<category>/<name>.png`.
#[derive(Debug, Clone)]
pub struct FileSurfaceSource {
    root: PathBuf,
}

impl FileSurfaceSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &SpriteKey) -> PathBuf {
        self.root
            .join("sprites")
            .join(key.category().as_str())
            .join(format!("{}.png", key.name()))
    }
}

impl SurfaceSource for FileSurfaceSource {
    fn load(&self, key: &SpriteKey) -> Result<Surface, AssetError> {
        let path = self.path_for(key);
        load_png_rgba(&path)
    }
}

fn load_png_rgba(path: &Path) -> Result<Surface, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Surface {
        width,
        height,
        rgba: image.into_raw(),
    })
}

/// Pixel sizes the catalog slices sheets with and sizes placeholders to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSizes {
    pub tile: (u32, u32),
    pub sprite_frame: (u32, u32),
}

impl AssetSizes {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            tile: (config.tile_width_px, config.tile_height_px),
            sprite_frame: config.sprite_frame_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CatalogEntry {
    surface: SurfaceId,
    frame_count: u32,
    frame_size: (u32, u32),
    placeholder: bool,
}

/// Eagerly loaded surfaces keyed by sprite key.
///
/// Every key handed to [`AssetCatalog::preload`] resolves to something drawable: a
/// failed load is swapped for a coloured placeholder and warned about once. Keys
/// that were never preloaded resolve to a shared placeholder, also warned once.
#[derive(Debug)]
pub struct AssetCatalog {
    surfaces: Vec<Surface>,
    entries: HashMap<SpriteKey, CatalogEntry>,
    fallback: CatalogEntry,
    warned_unknown_keys: RefCell<HashSet<String>>,
}

impl AssetCatalog {
    pub fn preload<I>(source: &dyn SurfaceSource, keys: I, sizes: AssetSizes) -> Self
    where
        I: IntoIterator<Item = SpriteKey>,
    {
        let fallback_surface = Surface::filled(
            sizes.sprite_frame.0,
            sizes.sprite_frame.1,
            PLACEHOLDER_COLOR,
        );
        let fallback = CatalogEntry {
            surface: SurfaceId(0),
            frame_count: 1,
            frame_size: (fallback_surface.width(), fallback_surface.height()),
            placeholder: true,
        };
        let mut catalog = Self {
            surfaces: vec![fallback_surface],
            entries: HashMap::new(),
            fallback,
            warned_unknown_keys: RefCell::new(HashSet::new()),
        };

        for key in keys {
            if catalog.entries.contains_key(&key) {
                continue;
            }
            let entry = match load_entry(source, &key, sizes) {
                Ok(surface) => {
                    let entry = describe_loaded(&key, &surface, sizes);
                    debug!(
                        sprite_key = %key,
                        width = surface.width(),
                        height = surface.height(),
                        frame_count = entry.1,
                        "asset_loaded"
                    );
                    catalog.push_entry(surface, entry.1, entry.0, false)
                }
                Err(error) => {
                    warn!(
                        sprite_key = %key,
                        reason = %error,
                        "asset_load_failed_using_placeholder"
                    );
                    let surface = placeholder_for(&key, sizes);
                    let frame_size = (surface.width(), surface.height());
                    catalog.push_entry(surface, 1, frame_size, true)
                }
            };
            catalog.entries.insert(key, entry);
        }
        catalog
    }

    fn push_entry(
        &mut self,
        surface: Surface,
        frame_count: u32,
        frame_size: (u32, u32),
        placeholder: bool,
    ) -> CatalogEntry {
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(surface);
        CatalogEntry {
            surface: id,
            frame_count,
            frame_size,
            placeholder,
        }
    }

    fn entry(&self, key: &SpriteKey) -> CatalogEntry {
        match self.entries.get(key) {
            Some(entry) => *entry,
            None => {
                if self.warned_unknown_keys.borrow_mut().insert(key.to_string()) {
                    warn!(sprite_key = %key, "asset_not_preloaded_using_placeholder");
                }
                self.fallback
            }
        }
    }

    pub fn resolve(&self, key: &SpriteKey) -> SurfaceId {
        self.entry(key).surface
    }

    /// Frames in a single-row sheet; at least one.
    pub fn frame_count(&self, key: &SpriteKey) -> u32 {
        self.entry(key).frame_count
    }

    pub fn frame_size(&self, key: &SpriteKey) -> (u32, u32) {
        self.entry(key).frame_size
    }

    pub fn is_placeholder(&self, key: &SpriteKey) -> bool {
        self.entry(key).placeholder
    }

    pub fn surface(&self, id: SurfaceId) -> &Surface {
        self.surfaces.get(id.0).unwrap_or(&self.surfaces[0])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_animated(category: AssetCategory) -> bool {
    matches!(category, AssetCategory::Player | AssetCategory::Animal)
}

fn load_entry(
    source: &dyn SurfaceSource,
    key: &SpriteKey,
    sizes: AssetSizes,
) -> Result<Surface, AssetError> {
    let surface = source.load(key)?;
    let frame_width = sizes.sprite_frame.0;
    if is_animated(key.category()) && surface.width() < frame_width {
        return Err(AssetError::SheetTooNarrow {
            key: key.to_string(),
            width: surface.width(),
            frame_width,
        });
    }
    if surface.width() == 0 || surface.height() == 0 {
        return Err(AssetError::NotFound {
            key: key.to_string(),
        });
    }
    Ok(surface)
}

/// Frame size and count for a loaded surface. Static sprites are one frame.
fn describe_loaded(key: &SpriteKey, surface: &Surface, sizes: AssetSizes) -> ((u32, u32), u32) {
    if is_animated(key.category()) {
        let frame_width = sizes.sprite_frame.0.max(1);
        let frames = (surface.width() / frame_width).max(1);
        ((frame_width, surface.height()), frames)
    } else {
        ((surface.width(), surface.height()), 1)
    }
}

fn placeholder_for(key: &SpriteKey, sizes: AssetSizes) -> Surface {
    match key.category() {
        AssetCategory::Tiles => {
            let color = match key.name() {
                "grass" => PLACEHOLDER_GRASS_COLOR,
                "dirt" => PLACEHOLDER_DIRT_COLOR,
                "rock" => PLACEHOLDER_ROCK_COLOR,
                "sand" => PLACEHOLDER_SAND_COLOR,
                "water" => PLACEHOLDER_WATER_COLOR,
                _ => PLACEHOLDER_COLOR,
            };
            Surface::diamond(sizes.tile.0, sizes.tile.1, color)
        }
        AssetCategory::Player => placeholder_block(sizes, PLACEHOLDER_PLAYER_COLOR),
        AssetCategory::Animal => placeholder_block(sizes, PLACEHOLDER_ANIMAL_COLOR),
        AssetCategory::Props => placeholder_block(sizes, PLACEHOLDER_PROP_COLOR),
    }
}

/// Half-width block standing on the bottom of a frame-sized box.
fn placeholder_block(sizes: AssetSizes, color: [u8; 4]) -> Surface {
    let (width, height) = sizes.sprite_frame;
    let mut surface = Surface::filled(width, height, [0, 0, 0, 0]);
    let left = surface.width() / 4;
    let right = surface.width() - left;
    let top = surface.height() / 2;
    for y in top..surface.height() {
        for x in left..right.max(left + 1).min(surface.width()) {
            surface.put(x, y, color);
        }
    }
    surface
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapSource {
        surfaces: HashMap<String, Surface>,
    }

    impl SurfaceSource for MapSource {
        fn load(&self, key: &SpriteKey) -> Result<Surface, AssetError> {
            self.surfaces
                .get(&key.to_string())
                .cloned()
                .ok_or_else(|| AssetError::NotFound {
                    key: key.to_string(),
                })
        }
    }

    fn sizes() -> AssetSizes {
        AssetSizes {
            tile: (64, 32),
            sprite_frame: (16, 24),
        }
    }

    fn key(raw: &str) -> SpriteKey {
        SpriteKey::parse(raw).expect("key")
    }

    #[test]
    fn sheet_frame_count_comes_from_width() {
        let source = MapSource {
            surfaces: HashMap::from([(
                "player/walk_south".to_string(),
                Surface::filled(64, 24, [1, 2, 3, 255]),
            )]),
        };
        let catalog = AssetCatalog::preload(&source, [key("player/walk_south")], sizes());
        assert_eq!(catalog.frame_count(&key("player/walk_south")), 4);
        assert_eq!(catalog.frame_size(&key("player/walk_south")), (16, 24));
        assert!(!catalog.is_placeholder(&key("player/walk_south")));
    }

    #[test]
    fn missing_asset_becomes_placeholder_with_one_frame() {
        let source = MapSource {
            surfaces: HashMap::new(),
        };
        let catalog = AssetCatalog::preload(&source, [key("tiles/water")], sizes());
        let water = key("tiles/water");
        assert!(catalog.is_placeholder(&water));
        assert_eq!(catalog.frame_count(&water), 1);
        let surface = catalog.surface(catalog.resolve(&water));
        assert_eq!((surface.width(), surface.height()), (64, 32));
        assert_eq!(surface.pixel(32, 16), Some(PLACEHOLDER_WATER_COLOR));
        assert_eq!(surface.pixel(0, 0).map(|p| p[3]), Some(0));
    }

    #[test]
    fn narrow_sheet_is_rejected_to_placeholder() {
        let source = MapSource {
            surfaces: HashMap::from([(
                "animal/idle_north".to_string(),
                Surface::filled(8, 24, [9, 9, 9, 255]),
            )]),
        };
        let catalog = AssetCatalog::preload(&source, [key("animal/idle_north")], sizes());
        assert!(catalog.is_placeholder(&key("animal/idle_north")));
    }

    #[test]
    fn unknown_key_resolves_to_shared_fallback() {
        let source = MapSource {
            surfaces: HashMap::new(),
        };
        let catalog = AssetCatalog::preload(&source, Vec::new(), sizes());
        let id = catalog.resolve(&key("props/tree"));
        assert_eq!(id, SurfaceId(0));
        assert_eq!(catalog.resolve(&key("props/tree")), id);
        assert_eq!(catalog.frame_count(&key("props/tree")), 1);
        assert!(catalog.is_empty());
    }

    #[test]
    fn unknown_key_is_remembered_once_per_key() {
        let source = MapSource {
            surfaces: HashMap::new(),
        };
        let catalog = AssetCatalog::preload(&source, Vec::new(), sizes());
        for _ in 0..3 {
            catalog.resolve(&key("props/tree"));
            catalog.frame_count(&key("props/tree"));
        }
        assert_eq!(catalog.warned_unknown_keys.borrow().len(), 1);
        catalog.resolve(&key("props/boulder"));
        catalog.resolve(&key("props/boulder"));
        assert_eq!(catalog.warned_unknown_keys.borrow().len(), 2);
        assert!(catalog
            .warned_unknown_keys
            .borrow()
            .contains("props/boulder"));
    }

    #[test]
    fn file_source_reads_png_from_category_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tiles_dir = dir.path().join("sprites").join("tiles");
        std::fs::create_dir_all(&tiles_dir).expect("mkdir");
        let image = image::RgbaImage::from_pixel(64, 32, image::Rgba([10, 20, 30, 255]));
        image.save(tiles_dir.join("grass.png")).expect("save png");

        let source = FileSurfaceSource::new(dir.path());
        let catalog = AssetCatalog::preload(&source, [key("tiles/grass"), key("tiles/sand")], sizes());
        let grass = catalog.surface(catalog.resolve(&key("tiles/grass")));
        assert_eq!(grass.pixel(5, 5), Some([10, 20, 30, 255]));
        assert!(!catalog.is_placeholder(&key("tiles/grass")));
        assert!(catalog.is_placeholder(&key("tiles/sand")));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn corrupt_png_is_decode_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let props_dir = dir.path().join("sprites").join("props");
        std::fs::create_dir_all(&props_dir).expect("mkdir");
        std::fs::write(props_dir.join("tree.png"), b"not a png").expect("write");
        let source = FileSurfaceSource::new(dir.path());
        let err = source.load(&key("props/tree")).expect_err("decode");
        assert!(matches!(err, AssetError::Decode { .. }));
    }

    #[test]
    fn surface_from_rgba_checks_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(Surface::from_rgba(2, 2, vec![0; 15]).is_none());
    }
}
