//! Tile Grid
//!
//! Immutable solidity grid built from a map layout. Tile `(x, y)` covers
//! `[x, x+1] × [y, y+1] × [0, ceiling]`.

use glam::{IVec2, Vec2, Vec3};

use crate::core::math::Aabb3;
use crate::game::definitions::{DefinitionError, DefinitionSet, MapDefinition};

/// One grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tile {
    /// Grid coordinate
    pub coords: IVec2,
    /// Blocks movement and rays
    pub solid: bool,
}

/// Fixed-size tile grid plus world ceiling.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: i32,
    height: i32,
    ceiling_height: f32,
    solid: Vec<bool>,
}

impl TileGrid {
    /// Build from a solidity mask in row-major order (`y * width + x`).
    ///
    /// Returns `None` if the mask length does not match the dimensions.
    pub fn from_mask(width: usize, height: usize, ceiling_height: f32, solid: Vec<bool>) -> Option<Self> {
        if width == 0 || height == 0 || solid.len() != width * height {
            return None;
        }
        Some(Self {
            width: width as i32,
            height: height as i32,
            ceiling_height,
            solid,
        })
    }

    /// Build from a map definition, resolving glyphs through `defs`.
    pub fn from_definition(map: &MapDefinition, defs: &DefinitionSet) -> Result<Self, DefinitionError> {
        let width = map.width();
        let height = map.height();
        let mut solid = Vec::with_capacity(width * height);

        for (y, row) in map.rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(DefinitionError::RaggedRows { map: map.name.clone(), row: y });
            }
            for glyph in row.chars() {
                let tile = defs.tile(glyph).ok_or_else(|| DefinitionError::UnknownGlyph {
                    map: map.name.clone(),
                    glyph,
                })?;
                solid.push(tile.solid);
            }
        }

        Self::from_mask(width, height, map.ceiling_height, solid)
            .ok_or_else(|| DefinitionError::EmptyMap(map.name.clone()))
    }

    /// Width in tiles.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// World ceiling Z.
    pub fn ceiling_height(&self) -> f32 {
        self.ceiling_height
    }

    /// Whether the planar position lies on the grid (edges inclusive).
    pub fn is_in_bounds(&self, position: Vec2) -> bool {
        position.x >= 0.0
            && position.y >= 0.0
            && position.x <= self.width as f32
            && position.y <= self.height as f32
    }

    /// Whether a tile coordinate is on the grid.
    pub fn contains_coords(&self, coords: IVec2) -> bool {
        coords.x >= 0 && coords.y >= 0 && coords.x < self.width && coords.y < self.height
    }

    /// Coordinate of the cell containing `position`.
    pub fn coords_of(position: Vec2) -> IVec2 {
        position.floor().as_ivec2()
    }

    /// Solidity of a cell; cells off the grid are open.
    pub fn is_solid(&self, coords: IVec2) -> bool {
        self.contains_coords(coords) && self.solid[(coords.y * self.width + coords.x) as usize]
    }

    /// Cell at `coords`, clamped to the nearest valid cell.
    pub fn tile_at(&self, coords: IVec2) -> Tile {
        let clamped = coords.clamp(IVec2::ZERO, IVec2::new(self.width - 1, self.height - 1));
        Tile {
            coords: clamped,
            solid: self.solid[(clamped.y * self.width + clamped.x) as usize],
        }
    }

    /// World-space bounds of a tile.
    pub fn tile_bounds(&self, coords: IVec2) -> Aabb3 {
        let min = Vec3::new(coords.x as f32, coords.y as f32, 0.0);
        Aabb3::new(min, min + Vec3::new(1.0, 1.0, self.ceiling_height))
    }
}
