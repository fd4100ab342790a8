use std::sync::Arc;

use glam::{IVec2, Vec2};

use crate::geometry::{Direction, Rect};
use crate::interaction::{InteractionLinks, InteractionType, ReactionFn, Reactions};

/// Handle into a room's tile arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u32);

impl TileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Collision model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionStyle {
    /// Boxes take part in axis-separated resolution.
    Rectangular,
    /// Each box is treated as the circle inscribed in it and pushes
    /// entities out along the normal from its center.
    Circular,
}

/// Tile-local boxes shared by every tile of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionModel {
    pub boxes: Vec<Rect>,
    pub style: CollisionStyle,
}

impl CollisionModel {
    pub fn new(style: CollisionStyle) -> Self {
        Self {
            boxes: Vec::new(),
            style,
        }
    }

    pub fn with_box(mut self, rect: Rect) -> Self {
        self.boxes.push(rect);
        self
    }

    /// One box covering a whole cell.
    pub fn block(cell_size: f32) -> Arc<Self> {
        Arc::new(Self::new(CollisionStyle::Rectangular).with_box(Rect::new(
            0.0, 0.0, cell_size, cell_size,
        )))
    }

    pub fn circle(cell_size: f32) -> Arc<Self> {
        Arc::new(Self::new(CollisionStyle::Circular).with_box(Rect::new(
            0.0, 0.0, cell_size, cell_size,
        )))
    }
}

// ---------------------------------------------------------------------------
// Tile flags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solidity {
    NotSolid,
    Solid,
    /// Blocks unless the entity passes over half-solids. One-way from
    /// above in side-scroll rooms.
    HalfSolid,
    /// Cliff edge that can be walked off in the given direction only.
    Ledge(Direction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Hole,
    Water,
    Lava,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TileMotion {
    /// Pixels per tick.
    pub velocity: Vec2,
    /// Travel left before the tile stops.
    pub remaining: f32,
}

impl TileMotion {
    pub fn endless(velocity: Vec2) -> Self {
        Self {
            velocity,
            remaining: f32::INFINITY,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }
}

// ---------------------------------------------------------------------------
// Grid footprint
// ---------------------------------------------------------------------------

/// Rectangle of cells, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl CellRect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.min.x && cell.y >= self.min.y && cell.x < self.max.x && cell.y < self.max.y
    }

    pub fn clipped(&self, bounds: CellRect) -> CellRect {
        CellRect {
            min: self.min.max(bounds.min),
            max: self.max.min(bounds.max),
        }
    }

    /// Cells in row-major order.
    pub fn cells(self) -> impl Iterator<Item = IVec2> {
        (self.min.y..self.max.y)
            .flat_map(move |y| (self.min.x..self.max.x).map(move |x| IVec2::new(x, y)))
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Tile {
    pub(crate) id: TileId,
    /// World position of the top-left corner. May drift off the grid while
    /// the tile moves; the grid re-homes it on refresh.
    pub position: Vec2,
    /// Footprint in cells.
    pub(crate) size: IVec2,
    pub(crate) extent: Vec2,
    pub(crate) location: IVec2,
    pub(crate) layer: usize,
    pub(crate) grid_area: CellRect,
    /// `None` makes the tile non-solid whatever its solidity says.
    pub model: Option<Arc<CollisionModel>>,
    pub solidity: Solidity,
    pub is_ladder: bool,
    pub is_movable: bool,
    pub hazard: Option<Hazard>,
    /// Velocity handed to grounded entities standing on the tile.
    pub conveyor: Vec2,
    pub motion: TileMotion,
    pub enabled: bool,
    pub reactions: Reactions,
    pub links: InteractionLinks,
}

impl Tile {
    pub fn new(model: Option<Arc<CollisionModel>>) -> Self {
        Self {
            id: TileId(u32::MAX),
            position: Vec2::ZERO,
            size: IVec2::ONE,
            extent: Vec2::ZERO,
            location: IVec2::ZERO,
            layer: 0,
            grid_area: CellRect::default(),
            model,
            solidity: Solidity::NotSolid,
            is_ladder: false,
            is_movable: false,
            hazard: None,
            conveyor: Vec2::ZERO,
            motion: TileMotion::default(),
            enabled: true,
            reactions: Reactions::default(),
            links: InteractionLinks::default(),
        }
    }

    pub fn solid(model: Arc<CollisionModel>) -> Self {
        Self::new(Some(model)).with_solidity(Solidity::Solid)
    }

    pub fn with_solidity(mut self, solidity: Solidity) -> Self {
        self.solidity = solidity;
        self
    }

    pub fn with_size(mut self, size: IVec2) -> Self {
        self.size = size.max(IVec2::ONE);
        self
    }

    pub fn ladder(mut self) -> Self {
        self.is_ladder = true;
        self
    }

    pub fn movable(mut self) -> Self {
        self.is_movable = true;
        self
    }

    pub fn with_hazard(mut self, hazard: Hazard) -> Self {
        self.hazard = Some(hazard);
        self
    }

    pub fn with_conveyor(mut self, velocity: Vec2) -> Self {
        self.conveyor = velocity;
        self
    }

    pub fn with_motion(mut self, motion: TileMotion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_reaction(mut self, kind: InteractionType, handler: ReactionFn) -> Self {
        self.reactions.set(kind, handler);
        self
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    /// Cell the tile is currently homed at.
    pub fn location(&self) -> IVec2 {
        self.location
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Footprint in cells.
    pub fn size(&self) -> IVec2 {
        self.size
    }

    /// Cells that currently reference this tile.
    pub fn grid_area(&self) -> CellRect {
        self.grid_area
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            min: self.position,
            size: self.extent,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_moving()
    }

    /// Slide `distance` pixels in `dir` at `speed` pixels per tick.
    pub fn start_move(&mut self, dir: Direction, distance: f32, speed: f32) {
        self.motion = TileMotion {
            velocity: dir.to_vec2() * speed,
            remaining: distance,
        };
    }

    /// World-space boxes of the collision model with their indices.
    pub fn collision_boxes(&self) -> impl Iterator<Item = (usize, Rect)> + '_ {
        self.model
            .iter()
            .flat_map(|model| model.boxes.iter().enumerate())
            .map(move |(i, b)| (i, b.translated(self.position)))
    }

    pub fn collision_style(&self) -> Option<CollisionStyle> {
        self.model.as_ref().map(|m| m.style)
    }
}
