pub mod tile;

use glam::{IVec2, Vec2};

use crate::geometry::Rect;
use crate::util::pool::Pool;

pub use tile::{
    CellRect, CollisionModel, CollisionStyle, Hazard, Solidity, Tile, TileId, TileMotion,
};

/// Layered cell grid over a room. Owns the room's tiles.
///
/// Each cell of each layer holds at most one tile reference. A tile with a
/// multi-cell footprint is referenced from every cell it covers; queries
/// report it once, from the first covered cell inside the query area.
pub struct TileGrid {
    cell_size: f32,
    inv_cell_size: f32,
    width: i32,
    height: i32,
    layer_count: usize,
    /// `layer * width * height + y * width + x`.
    cells: Vec<Option<TileId>>,
    /// References displaced by a tile placed over them, restored when that
    /// tile leaves the cell. Latest last.
    covered: Vec<(usize, TileId)>,
    tiles: Pool<Tile>,
}

impl TileGrid {
    pub fn new(width: u32, height: u32, layer_count: usize, cell_size: f32) -> Self {
        assert!(
            width > 0 && height > 0 && layer_count > 0,
            "tile grid needs at least one cell and one layer"
        );
        assert!(cell_size > 0.0, "cell size must be positive");
        let count = width as usize * height as usize * layer_count;
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            width: width as i32,
            height: height as i32,
            layer_count,
            cells: vec![None; count],
            covered: Vec::new(),
            tiles: Pool::with_capacity(count / layer_count),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Room bounds in pixels.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width as f32 * self.cell_size,
            self.height as f32 * self.cell_size,
        )
    }

    fn full_area(&self) -> CellRect {
        CellRect::new(IVec2::ZERO, IVec2::new(self.width, self.height))
    }

    pub fn cell_coords(&self, pos: Vec2) -> IVec2 {
        (pos * self.inv_cell_size).floor().as_ivec2()
    }

    /// Cells overlapped by `rect`, clipped to the grid.
    pub fn cell_area(&self, rect: Rect) -> CellRect {
        let min = (rect.min * self.inv_cell_size).floor().as_ivec2();
        let max = (rect.max() * self.inv_cell_size).ceil().as_ivec2();
        CellRect::new(min, max).clipped(self.full_area())
    }

    fn index(&self, cell: IVec2, layer: usize) -> Option<usize> {
        if layer >= self.layer_count || !self.full_area().contains(cell) {
            return None;
        }
        let layer_len = (self.width * self.height) as usize;
        Some(layer * layer_len + (cell.y * self.width + cell.x) as usize)
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    /// Move `tile` into the arena and place it at `location`.
    pub fn add_tile(&mut self, tile: Tile, location: IVec2, layer: usize) -> TileId {
        let id = TileId(self.tiles.alloc(tile) as u32);
        if let Some(tile) = self.tiles.get_mut(id.index()) {
            tile.id = id;
        }
        self.place_tile(id, location, layer);
        id
    }

    /// Re-home an existing tile, snapping its position to `location`.
    pub fn place_tile(&mut self, id: TileId, location: IVec2, layer: usize) {
        let cell_size = self.cell_size;
        let layer = layer.min(self.layer_count - 1);
        self.clear_footprint(id);
        let Some(tile) = self.tiles.get_mut(id.index()) else {
            return;
        };
        tile.position = location.as_vec2() * cell_size;
        tile.extent = tile.size.as_vec2() * cell_size;
        tile.location = location;
        tile.layer = layer;
        self.write_footprint(id);
    }

    /// Change a tile's footprint, keeping its location.
    pub fn resize_tile(&mut self, id: TileId, size: IVec2) {
        let Some(tile) = self.tiles.get(id.index()) else {
            return;
        };
        let (location, layer) = (tile.location, tile.layer);
        self.clear_footprint(id);
        if let Some(tile) = self.tiles.get_mut(id.index()) {
            tile.size = size.max(IVec2::ONE);
        }
        self.place_tile(id, location, layer);
    }

    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        self.clear_footprint(id);
        self.tiles.free(id.index())
    }

    /// Re-home a tile whose position has drifted to a different nearest
    /// cell. Returns true when the referenced cells changed.
    pub fn refresh_tile(&mut self, id: TileId) -> bool {
        let Some(tile) = self.tiles.get(id.index()) else {
            return false;
        };
        let target = (tile.position * self.inv_cell_size).round().as_ivec2();
        if target == tile.location {
            return false;
        }
        self.clear_footprint(id);
        if let Some(tile) = self.tiles.get_mut(id.index()) {
            tile.location = target;
        }
        self.write_footprint(id);
        true
    }

    fn write_footprint(&mut self, id: TileId) {
        let full = self.full_area();
        let Some(tile) = self.tiles.get_mut(id.index()) else {
            return;
        };
        let area = CellRect::new(tile.location, tile.location + tile.size).clipped(full);
        tile.grid_area = area;
        let layer = tile.layer;
        for cell in area.cells() {
            if let Some(i) = self.index(cell, layer) {
                if let Some(other) = self.cells[i].filter(|&other| other != id) {
                    self.covered.push((i, other));
                }
                self.cells[i] = Some(id);
            }
        }
    }

    fn clear_footprint(&mut self, id: TileId) {
        let Some(tile) = self.tiles.get(id.index()) else {
            return;
        };
        let (area, layer) = (tile.grid_area, tile.layer);
        for cell in area.cells() {
            let Some(i) = self.index(cell, layer) else {
                continue;
            };
            if self.cells[i] == Some(id) {
                self.cells[i] = self
                    .covered
                    .iter()
                    .rposition(|&(slot, _)| slot == i)
                    .map(|at| self.covered.remove(at).1);
            } else {
                self.covered.retain(|&entry| entry != (i, id));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.get_mut(id.index())
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().map(|(_, t)| t)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile_at(&self, location: IVec2, layer: usize) -> Option<&Tile> {
        let id = self.cells[self.index(location, layer)?]?;
        self.tiles.get(id.index())
    }

    /// Tile on the highest occupied layer at `location`.
    pub fn top_tile(&self, location: IVec2) -> Option<&Tile> {
        (0..self.layer_count)
            .rev()
            .find_map(|layer| self.tile_at(location, layer))
    }

    /// Every tile referenced from `area`, each reported once.
    fn tiles_in_area(&self, area: CellRect) -> impl Iterator<Item = &Tile> + '_ {
        let layers = self.layer_count;
        area.cells()
            .flat_map(move |cell| (0..layers).map(move |layer| (cell, layer)))
            .filter_map(move |(cell, layer)| {
                let tile = self.tile_at(cell, layer)?;
                (tile.grid_area.min.max(area.min) == cell).then_some(tile)
            })
    }

    /// Tiles whose actual bounds overlap `rect`. Candidate cells are widened
    /// by one cell so tiles drifting out of their footprint are still found.
    pub fn tiles_touching(&self, rect: Rect) -> impl Iterator<Item = &Tile> + '_ {
        let area = self.cell_area(rect.inflated(self.cell_size));
        self.tiles_in_area(area)
            .filter(move |tile| tile.bounds().intersects(&rect))
    }

    pub fn tiles_at_point(&self, point: Vec2) -> impl Iterator<Item = &Tile> + '_ {
        let cell = self.cell_coords(point);
        let area = CellRect::new(cell - IVec2::ONE, cell + IVec2::splat(2)).clipped(self.full_area());
        self.tiles_in_area(area)
            .filter(move |tile| tile.bounds().contains_point(point))
    }

    pub fn top_tile_at_point(&self, point: Vec2) -> Option<&Tile> {
        self.tiles_at_point(point).max_by_key(|tile| tile.layer)
    }
}
