use glam::Vec2;
use smallvec::SmallVec;

use crate::geometry::{Direction, Rect};
use crate::room::RoomTransition;
use crate::spatial::{TileGrid, TileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InteractionType {
    /// Plain body contact.
    Touch,
    Sword,
    SwordSpin,
    Shield,
    Arrow,
    Boomerang,
    Bomb,
    Fire,
    Pickup,
    /// An entity leaning into a movable tile.
    Push,
    /// A moving tile running into an entity.
    MovingTile,
}

/// One side of an interaction. Tiles stand in as proxy participants so
/// tile pushes flow through the same records as entity interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    Entity(hecs::Entity),
    Tile(TileId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionKey {
    pub action: Participant,
    pub reaction: Participant,
    pub kind: InteractionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InteractionArgs {
    /// Dominant direction from the action box toward the reaction box.
    pub direction: Option<Direction>,
    /// Center of the overlap between the two boxes.
    pub contact: Vec2,
}

impl InteractionArgs {
    pub fn between(action_box: &Rect, reaction_box: &Rect) -> Self {
        let overlap = Rect::from_min_max(
            action_box.min.max(reaction_box.min),
            action_box.max().min(reaction_box.max()),
        );
        Self {
            direction: Direction::dominant(reaction_box.center() - action_box.center()),
            contact: overlap.center(),
        }
    }
}

/// A live interaction between two participants.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionCollision {
    pub key: InteractionKey,
    pub action_box: Rect,
    pub reaction_box: Rect,
    pub args: InteractionArgs,
    /// False for records injected by `trigger_reaction`.
    pub auto_detected: bool,
    pub(crate) stay_alive: bool,
    /// Ticks this interaction has been confirmed.
    pub duration: u32,
}

// ---------------------------------------------------------------------------
// Reaction handlers
// ---------------------------------------------------------------------------

/// What a reaction handler may touch.
pub struct ReactionContext<'a> {
    pub world: &'a mut hecs::World,
    pub tiles: &'a mut TileGrid,
    /// Set to request a room transition at the end of the tick.
    pub transition: &'a mut Option<RoomTransition>,
}

pub type ReactionFn = fn(&mut ReactionContext<'_>, &InteractionCollision);

/// Handlers a participant runs when acted upon, keyed by interaction type.
#[derive(Debug, Clone, Default)]
pub struct Reactions {
    handlers: SmallVec<[(InteractionType, ReactionFn); 4]>,
}

impl Reactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, kind: InteractionType, handler: ReactionFn) -> Self {
        self.set(kind, handler);
        self
    }

    pub fn set(&mut self, kind: InteractionType, handler: ReactionFn) {
        match self.handlers.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = handler,
            None => self.handlers.push((kind, handler)),
        }
    }

    pub fn handler(&self, kind: InteractionType) -> Option<ReactionFn> {
        self.handlers
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, handler)| *handler)
    }

    pub fn reacts_to(&self, kind: InteractionType) -> bool {
        self.handler(kind).is_some()
    }

    pub fn kinds(&self) -> impl Iterator<Item = InteractionType> + '_ {
        self.handlers.iter().map(|(k, _)| *k)
    }
}

/// Interactions a participant is currently part of.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionLinks {
    pub actions: Vec<InteractionKey>,
    pub reactions: Vec<InteractionKey>,
}

impl InteractionLinks {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.reactions.is_empty()
    }

    pub(crate) fn unlink(&mut self, key: &InteractionKey) {
        self.actions.retain(|k| k != key);
        self.reactions.retain(|k| k != key);
    }
}

// ---------------------------------------------------------------------------
// Interaction boxes
// ---------------------------------------------------------------------------

/// An action an entity performs over its own local box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionBox {
    pub kind: InteractionType,
    pub rect: Rect,
}

/// Entity-local interaction geometry, independent of the collision box.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionBox {
    /// Box other entities' actions are tested against.
    pub rect: Rect,
    pub enabled: bool,
    pub actions: SmallVec<[ActionBox; 2]>,
}

impl InteractionBox {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            enabled: true,
            actions: SmallVec::new(),
        }
    }

    /// Act with `kind` over the whole interaction box.
    pub fn with_action(mut self, kind: InteractionType) -> Self {
        let rect = self.rect;
        self.actions.push(ActionBox { kind, rect });
        self
    }

    pub fn with_action_box(mut self, kind: InteractionType, rect: Rect) -> Self {
        self.actions.push(ActionBox { kind, rect });
        self
    }
}
