use perlin2::Perlin2;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use thiserror::Error;
use tracing::debug;

use crate::config::TerrainConfig;

use super::tilemap::{TileMap, TileMapError, TileType};

const TILE_TYPE_COUNT: usize = TileType::ALL.len();
const MAJORITY_THRESHOLD: u8 = 3;
const GRASS_MOISTURE_MIN: f64 = 0.45;
const HIGHLAND_DRY_MAX: f64 = 0.35;
const SHORE_EDGE_FACTOR: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TerrainError {
    #[error("map dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error(transparent)]
    TileMap(#[from] TileMapError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainStats {
    pub counts: [usize; TILE_TYPE_COUNT],
    pub cells_smoothed: usize,
    pub islands_removed: usize,
}

impl TerrainStats {
    pub fn count(&self, tile: TileType) -> usize {
        self.counts[tile.ordinal()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTerrain {
    pub tilemap: TileMap,
    pub stats: TerrainStats,
}

/// Generates a map with the default terrain parameters.
pub fn generate(width: i32, height: i32, seed: u64) -> Result<TileMap, TerrainError> {
    generate_with_config(width, height, seed, &TerrainConfig::default())
        .map(|generated| generated.tilemap)
}

/// Layered noise, banded into tile types, then majority smoothing and an
/// island sweep. Output depends only on the arguments.
pub fn generate_with_config(
    width: i32,
    height: i32,
    seed: u64,
    config: &TerrainConfig,
) -> Result<GeneratedTerrain, TerrainError> {
    if width <= 0 || height <= 0 {
        return Err(TerrainError::InvalidDimensions { width, height });
    }

    let mut rng = XorShiftRng::seed_from_u64(seed);
    let height_noise = Perlin2::new(&mut rng);
    let moisture_noise = Perlin2::new(&mut rng);

    let largest = width.max(height) as f64;
    let height_field = NoiseField {
        noise: &height_noise,
        scale: (largest * config.height_scale_factor).max(8.0),
        octaves: config.height_octaves,
        persistence: config.height_persistence,
        lacunarity: config.lacunarity,
    };
    let moisture_field = NoiseField {
        noise: &moisture_noise,
        scale: (largest * config.moisture_scale_factor).max(6.0),
        octaves: config.moisture_octaves,
        persistence: config.moisture_persistence,
        lacunarity: config.lacunarity,
    };

    let mut tiles = Vec::with_capacity(width as usize * height as usize);
    for row in 0..height {
        for col in 0..width {
            let elevation = height_field.sample(col, row)
                - shore_penalty(col, row, width, height, config.shore_falloff);
            let moisture = moisture_field.sample(col, row);
            tiles.push(classify(elevation, moisture, config));
        }
    }

    let mut stats = TerrainStats::default();
    for _ in 0..config.smoothing_passes.max(1) {
        let (smoothed, changed) = majority_pass(&tiles, width, height);
        tiles = smoothed;
        stats.cells_smoothed += changed;
        if changed == 0 {
            break;
        }
    }
    stats.islands_removed = remove_islands(&mut tiles, width, height);
    for tile in &tiles {
        stats.counts[tile.ordinal()] += 1;
    }

    debug!(
        seed,
        width,
        height,
        cells_smoothed = stats.cells_smoothed,
        islands_removed = stats.islands_removed,
        "terrain_smoothed"
    );

    let tilemap = TileMap::new(width as u32, height as u32, tiles)?;
    Ok(GeneratedTerrain { tilemap, stats })
}

struct NoiseField<'a> {
    noise: &'a Perlin2,
    scale: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
}

impl NoiseField<'_> {
    /// Fractal sum normalised to [0, 1], sampled at the cell centre.
    fn sample(&self, col: i32, row: i32) -> f64 {
        let x = (col as f64 + 0.5) / self.scale;
        let y = (row as f64 + 0.5) / self.scale;
        let mut total = 0.0;
        let mut max_value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..self.octaves.max(1) {
            total += self.noise.noise01((x * frequency, y * frequency)) * amplitude;
            max_value += amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }
        if max_value <= 0.0 {
            return 0.5;
        }
        (total / max_value).clamp(0.0, 1.0)
    }
}

fn shore_penalty(col: i32, row: i32, width: i32, height: i32, falloff: f64) -> f64 {
    let edge_distance = col.min(row).min(width - 1 - col).min(height - 1 - row) as f64;
    let max_distance = (width.min(height) as f64 / 2.0).max(1.0);
    let edge_factor = edge_distance / max_distance;
    (SHORE_EDGE_FACTOR - edge_factor).max(0.0) * falloff
}

fn classify(elevation: f64, moisture: f64, config: &TerrainConfig) -> TileType {
    if elevation < config.water_level {
        TileType::Water
    } else if elevation < config.sand_level {
        TileType::Sand
    } else if elevation < config.highland_level {
        if moisture >= GRASS_MOISTURE_MIN {
            TileType::Grass
        } else {
            TileType::Dirt
        }
    } else if elevation < config.rock_level {
        if moisture < HIGHLAND_DRY_MAX {
            TileType::Dirt
        } else {
            TileType::Grass
        }
    } else {
        TileType::Rock
    }
}

/// Reflects an out-of-range index back into `0..len`.
fn mirror(index: i32, len: i32) -> i32 {
    if len <= 1 {
        return 0;
    }
    if index < 0 {
        -index
    } else if index >= len {
        2 * (len - 1) - index
    } else {
        index
    }
}

fn neighbours(tiles: &[TileType], width: i32, height: i32, col: i32, row: i32) -> [TileType; 4] {
    let at = |c: i32, r: i32| {
        let c = mirror(c, width);
        let r = mirror(r, height);
        tiles[r as usize * width as usize + c as usize]
    };
    [
        at(col, row - 1),
        at(col + 1, row),
        at(col, row + 1),
        at(col - 1, row),
    ]
}

fn neighbour_counts(around: &[TileType; 4]) -> [u8; TILE_TYPE_COUNT] {
    let mut counts = [0u8; TILE_TYPE_COUNT];
    for tile in around {
        counts[tile.ordinal()] += 1;
    }
    counts
}

fn majority_pass(tiles: &[TileType], width: i32, height: i32) -> (Vec<TileType>, usize) {
    let mut next = tiles.to_vec();
    let mut changed = 0;
    for row in 0..height {
        for col in 0..width {
            let index = row as usize * width as usize + col as usize;
            let counts = neighbour_counts(&neighbours(tiles, width, height, col, row));
            let majority = TileType::ALL
                .into_iter()
                .find(|tile| counts[tile.ordinal()] >= MAJORITY_THRESHOLD);
            if let Some(majority) = majority {
                if majority != tiles[index] {
                    next[index] = majority;
                    changed += 1;
                }
            }
        }
    }
    (next, changed)
}

/// Reassigns every cell that differs from all four neighbours.
///
/// Fixing one cell only adds matches for its neighbours, so a single in-place
/// sweep leaves no islands behind.
fn remove_islands(tiles: &mut [TileType], width: i32, height: i32) -> usize {
    let mut removed = 0;
    for row in 0..height {
        for col in 0..width {
            let index = row as usize * width as usize + col as usize;
            let current = tiles[index];
            let around = neighbours(tiles, width, height, col, row);
            if around.contains(&current) {
                continue;
            }
            let counts = neighbour_counts(&around);
            let mut best = around[0];
            for tile in TileType::ALL {
                if counts[tile.ordinal()] > counts[best.ordinal()] {
                    best = tile;
                } else if counts[tile.ordinal()] == counts[best.ordinal()]
                    && tile.ordinal() < best.ordinal()
                {
                    best = tile;
                }
            }
            tiles[index] = best;
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Cell;

    fn assert_no_interior_islands(tilemap: &TileMap) {
        let (width, height) = tilemap.dimensions();
        for row in 1..height as i32 - 1 {
            for col in 1..width as i32 - 1 {
                let tile = tilemap.tile_at(col, row).expect("in bounds");
                let differs_from_all = [(0, -1), (1, 0), (0, 1), (-1, 0)]
                    .into_iter()
                    .all(|(dc, dr)| tilemap.tile_at(col + dc, row + dr).expect("neighbour") != tile);
                assert!(
                    !differs_from_all,
                    "island at {:?} ({tile:?})",
                    Cell::new(col, row)
                );
            }
        }
    }

    #[test]
    fn same_arguments_produce_identical_grids() {
        for (width, height, seed) in [(10, 10, 42), (17, 9, 7), (32, 32, 123_456), (5, 40, 0)] {
            let first = generate(width, height, seed).expect("first");
            let second = generate(width, height, seed).expect("second");
            assert_eq!(first, second, "{width}x{height} seed={seed}");
        }
    }

    #[test]
    fn ten_by_ten_seed_42_scenario() {
        let first = generate(10, 10, 42).expect("first");
        let second = generate(10, 10, 42).expect("second");
        assert_eq!(first.tile_at(0, 0), second.tile_at(0, 0));
        assert_eq!(first.dimensions(), (10, 10));
    }

    #[test]
    fn different_seeds_usually_differ() {
        let maps: Vec<TileMap> = (0..4)
            .map(|seed| generate(24, 24, seed).expect("map"))
            .collect();
        let distinct = maps.windows(2).filter(|pair| pair[0] != pair[1]).count();
        assert!(distinct > 0);
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        for (width, height) in [(0, 10), (10, 0), (-3, 5), (0, 0)] {
            assert_eq!(
                generate(width, height, 1),
                Err(TerrainError::InvalidDimensions { width, height })
            );
        }
    }

    #[test]
    fn smoothed_maps_have_no_interior_islands() {
        for seed in [1, 2, 3, 42, 99, 2024] {
            for (width, height) in [(5, 5), (10, 10), (16, 9), (40, 40)] {
                let tilemap = generate(width, height, seed).expect("map");
                assert_no_interior_islands(&tilemap);
            }
        }
    }

    #[test]
    fn island_sweep_is_enough_even_without_majority_passes() {
        let config = TerrainConfig {
            smoothing_passes: 0,
            ..TerrainConfig::default()
        };
        let generated = generate_with_config(30, 30, 5, &config).expect("map");
        assert_no_interior_islands(&generated.tilemap);
    }

    #[test]
    fn stats_account_for_every_cell() {
        let generated =
            generate_with_config(20, 12, 11, &TerrainConfig::default()).expect("map");
        let total: usize = generated.stats.counts.iter().sum();
        assert_eq!(total, 240);
        for tile in TileType::ALL {
            assert_eq!(generated.stats.count(tile), generated.tilemap.count_of(tile));
        }
    }

    #[test]
    fn shore_falloff_floods_the_border() {
        let config = TerrainConfig {
            shore_falloff: 10.0,
            ..TerrainConfig::default()
        };
        let tilemap = generate_with_config(12, 12, 3, &config)
            .expect("map")
            .tilemap;
        for col in 0..12 {
            assert_eq!(tilemap.tile_at(col, 0), Ok(TileType::Water));
            assert_eq!(tilemap.tile_at(col, 11), Ok(TileType::Water));
        }
    }

    #[test]
    fn single_cell_map_is_valid() {
        let tilemap = generate(1, 1, 9).expect("map");
        assert_eq!(tilemap.dimensions(), (1, 1));
    }

    #[test]
    fn remove_islands_fixes_a_checkerboard() {
        let width = 4;
        let height = 4;
        let mut tiles: Vec<TileType> = (0..16)
            .map(|index| {
                if (index % 4 + index / 4) % 2 == 0 {
                    TileType::Grass
                } else {
                    TileType::Sand
                }
            })
            .collect();
        let removed = remove_islands(&mut tiles, width, height);
        assert!(removed > 0);
        let tilemap = TileMap::new(4, 4, tiles).expect("tilemap");
        assert_no_interior_islands(&tilemap);
    }

    #[test]
    fn mirror_reflects_edges() {
        assert_eq!(mirror(-1, 5), 1);
        assert_eq!(mirror(5, 5), 3);
        assert_eq!(mirror(2, 5), 2);
        assert_eq!(mirror(-1, 1), 0);
        assert_eq!(mirror(2, 2), 0);
    }

    #[test]
    fn majority_pass_replaces_surrounded_cell() {
        let mut tiles = vec![TileType::Grass; 9];
        tiles[4] = TileType::Water;
        let (next, changed) = majority_pass(&tiles, 3, 3);
        assert_eq!(changed, 1);
        assert_eq!(next[4], TileType::Grass);
    }
}
