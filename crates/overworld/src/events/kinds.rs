//! # Movement Event Kinds
//!
//! | Kind            | Shape         | Fired when                          |
//! |-----------------|---------------|-------------------------------------|
//! | `MoveStarted`   | cancellable   | a legal move is about to commit     |
//! | `MoveCompleted` | notification  | an entity arrives on its target     |
//! | `MoveBlocked`   | notification  | an attempted move was refused       |

use overworld_core::EntityId;

use super::bus::{Channel, Event, EventBus, EventHeader, NotificationEvent};
use crate::collision::BlockReason;
use crate::grid::{Direction, TileCoord};

/// A move passed collision and is about to begin. Handlers may veto it by
/// setting `cancelled`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveStarted {
    header: EventHeader,
    /// Moving entity.
    pub entity: EntityId,
    /// Map the move happens on.
    pub map_id: i32,
    /// Tile being left.
    pub from: TileCoord,
    /// Tile the entity will end on (past the ledge for a jump).
    pub to: TileCoord,
    /// Direction of travel.
    pub direction: Direction,
    /// Set when the move is a ledge jump.
    pub ledge_jump: Option<Direction>,
    /// Written by handlers; read by the publisher after dispatch.
    pub cancelled: bool,
}

impl MoveStarted {
    /// Fills in the payload and marks the event configured.
    pub fn configure(
        &mut self,
        entity: EntityId,
        map_id: i32,
        from: TileCoord,
        to: TileCoord,
        direction: Direction,
        ledge_jump: Option<Direction>,
    ) {
        self.entity = entity;
        self.map_id = map_id;
        self.from = from;
        self.to = to;
        self.direction = direction;
        self.ledge_jump = ledge_jump;
        self.cancelled = false;
        self.header.mark_configured();
    }

    /// Vetoes the move.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }
}

impl Event for MoveStarted {
    const NAME: &'static str = "MoveStarted";

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn channel(bus: &EventBus) -> &Channel<Self> {
        bus.move_started()
    }
}

/// An entity arrived on its target tile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveCompleted {
    header: EventHeader,
    /// Entity that arrived.
    pub entity: EntityId,
    /// Map of the move.
    pub map_id: i32,
    /// Tile the move started on.
    pub from: TileCoord,
    /// Tile the entity now occupies.
    pub to: TileCoord,
    /// Direction of travel.
    pub direction: Direction,
}

impl MoveCompleted {
    /// Fills in the payload and marks the event configured.
    pub fn configure(
        &mut self,
        entity: EntityId,
        map_id: i32,
        from: TileCoord,
        to: TileCoord,
        direction: Direction,
    ) {
        self.entity = entity;
        self.map_id = map_id;
        self.from = from;
        self.to = to;
        self.direction = direction;
        self.header.mark_configured();
    }
}

impl Event for MoveCompleted {
    const NAME: &'static str = "MoveCompleted";

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn channel(bus: &EventBus) -> &Channel<Self> {
        bus.move_completed()
    }
}

impl NotificationEvent for MoveCompleted {}

/// An attempted move was refused.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveBlocked {
    header: EventHeader,
    /// Entity that tried to move.
    pub entity: EntityId,
    /// Map of the attempt.
    pub map_id: i32,
    /// Tile the entity stays on.
    pub from: TileCoord,
    /// Tile it tried to enter.
    pub target: TileCoord,
    /// Attempted direction.
    pub direction: Direction,
    /// Why it was refused.
    pub reason: BlockReason,
}

impl MoveBlocked {
    /// Fills in the payload and marks the event configured.
    pub fn configure(
        &mut self,
        entity: EntityId,
        map_id: i32,
        from: TileCoord,
        target: TileCoord,
        direction: Direction,
        reason: BlockReason,
    ) {
        self.entity = entity;
        self.map_id = map_id;
        self.from = from;
        self.target = target;
        self.direction = direction;
        self.reason = reason;
        self.header.mark_configured();
    }
}

impl Event for MoveBlocked {
    const NAME: &'static str = "MoveBlocked";

    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut EventHeader {
        &mut self.header
    }

    fn channel(bus: &EventBus) -> &Channel<Self> {
        bus.move_blocked()
    }
}

impl NotificationEvent for MoveBlocked {}
