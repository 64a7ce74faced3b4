//! Entity variants.
//!
//! Every occupant of the board is one [`Entity`] variant. Behavior is
//! selected by matching on the variant, never by inspecting runtime
//! types, and every variant carries exactly the state its role needs.

use crowdgrid_types::{Direction, EntityId, EntityKind, PlayerAction, Position, Side};

// ---------------------------------------------------------------------------
// Variant state
// ---------------------------------------------------------------------------

/// Entry, exit, or gate portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Portal {
    /// Side whose walkers this portal admits (entries, gates) or whose
    /// walkers it leaves alone (exits, gates).
    pub side: Side,
}

/// A pedestrian crossing the board.
#[derive(Debug, Clone, PartialEq)]
pub struct Walker {
    /// Side the walker entered from.
    pub side: Side,
    /// Per-tick activation probability.
    pub speed: f64,
    /// Extra cost of standing still.
    pub impatience: f64,
    /// Heading of the last move.
    pub orientation: Direction,
    /// Consecutive activations without moving.
    pub cant_move: u32,
    /// Ticks on the board.
    pub age: u64,
    /// Euclidean distance travelled.
    pub distance: f64,
    /// Ticks on which the walker was activated.
    pub activations: u64,
}

impl Walker {
    /// A fresh walker facing away from its own edge.
    pub const fn new(side: Side, speed: f64, impatience: f64) -> Self {
        Self {
            side,
            speed,
            impatience,
            orientation: facing(side),
            cant_move: 0,
            age: 0,
            distance: 0.0,
            activations: 0,
        }
    }
}

/// A team member in one of the flag games.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Team.
    pub side: Side,
    /// Per-tick activation probability.
    pub speed: f64,
    /// Heading of the last move.
    pub orientation: Direction,
    /// Action chosen on the most recent turn.
    pub action: PlayerAction,
    /// Opponent flag currently carried.
    pub carried_flag: Option<EntityId>,
    /// Skip the next move after picking up a flag.
    pub flag_wait: bool,
    /// Jail holding this player.
    pub arrested_in: Option<EntityId>,
    /// Remaining ticks of incapacitation after being shot.
    pub lock_countdown: u32,
    /// Consecutive activations without moving.
    pub cant_move: u32,
}

impl Player {
    /// A fresh player facing the opposing half.
    pub const fn new(side: Side, speed: f64, action: PlayerAction) -> Self {
        Self {
            side,
            speed,
            orientation: facing(side),
            action,
            carried_flag: None,
            flag_wait: false,
            arrested_in: None,
            lock_countdown: 0,
            cant_move: 0,
        }
    }
}

/// A team flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    /// Owning team.
    pub side: Side,
    /// Cell the flag respawns on after a delivery.
    pub home: Position,
    /// Player carrying the flag.
    pub carrier: Option<EntityId>,
}

/// A holding cell for arrested opponents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jail {
    /// Team that owns the jail and fills it.
    pub side: Side,
    /// Player currently held.
    pub prisoner: Option<EntityId>,
}

/// A drop-off cell for captured flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Team that scores here.
    pub side: Side,
}

/// A projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireShot {
    /// Fixed heading.
    pub orientation: Direction,
    /// Cells travelled so far.
    pub travelled: u32,
    /// Cells travelled before the shot expires.
    pub lifetime: u32,
    /// Hit something; removed on its next turn.
    pub crashed: bool,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// Anything that can occupy a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    /// Impassable boundary.
    Wall,
    /// Spawns walkers.
    Entry(Portal),
    /// Removes walkers of the other side.
    Exit(Portal),
    /// Spawns natives and removes foreigners.
    Gate(Portal),
    /// Pedestrian.
    Walker(Walker),
    /// Flag-game team member.
    Player(Player),
    /// Team flag.
    Flag(Flag),
    /// Holding cell.
    Jail(Jail),
    /// Flag drop-off cell.
    Delivery(Delivery),
    /// Projectile.
    FireShot(FireShot),
}

impl Entity {
    /// Kind discriminant.
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Wall => EntityKind::Wall,
            Self::Entry(_) => EntityKind::Entry,
            Self::Exit(_) => EntityKind::Exit,
            Self::Gate(_) => EntityKind::Gate,
            Self::Walker(_) => EntityKind::Walker,
            Self::Player(_) => EntityKind::Player,
            Self::Flag(_) => EntityKind::Flag,
            Self::Jail(_) => EntityKind::Jail,
            Self::Delivery(_) => EntityKind::Delivery,
            Self::FireShot(_) => EntityKind::FireShot,
        }
    }

    /// Owning side or team, if the variant has one.
    pub const fn side(&self) -> Option<Side> {
        match self {
            Self::Entry(p) | Self::Exit(p) | Self::Gate(p) => Some(p.side),
            Self::Walker(w) => Some(w.side),
            Self::Player(p) => Some(p.side),
            Self::Flag(f) => Some(f.side),
            Self::Jail(j) => Some(j.side),
            Self::Delivery(d) => Some(d.side),
            Self::Wall | Self::FireShot(_) => None,
        }
    }

    /// Heading, for entities that move.
    pub const fn orientation(&self) -> Option<Direction> {
        match self {
            Self::Walker(w) => Some(w.orientation),
            Self::Player(p) => Some(p.orientation),
            Self::FireShot(s) => Some(s.orientation),
            _ => None,
        }
    }

    /// Whether the entity takes a turn each tick.
    ///
    /// Walls, jails, and deliveries are inert and never scheduled.
    pub const fn acts(&self) -> bool {
        !matches!(self, Self::Wall | Self::Jail(_) | Self::Delivery(_))
    }

    /// Whether this is a wall.
    pub const fn is_wall(&self) -> bool {
        matches!(self, Self::Wall)
    }

    /// Borrow the walker state.
    pub const fn as_walker(&self) -> Option<&Walker> {
        match self {
            Self::Walker(w) => Some(w),
            _ => None,
        }
    }

    /// Mutably borrow the walker state.
    pub const fn as_walker_mut(&mut self) -> Option<&mut Walker> {
        match self {
            Self::Walker(w) => Some(w),
            _ => None,
        }
    }

    /// Borrow the player state.
    pub const fn as_player(&self) -> Option<&Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Mutably borrow the player state.
    pub const fn as_player_mut(&mut self) -> Option<&mut Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    /// Borrow the flag state.
    pub const fn as_flag(&self) -> Option<&Flag> {
        match self {
            Self::Flag(f) => Some(f),
            _ => None,
        }
    }

    /// Mutably borrow the flag state.
    pub const fn as_flag_mut(&mut self) -> Option<&mut Flag> {
        match self {
            Self::Flag(f) => Some(f),
            _ => None,
        }
    }

    /// Borrow the jail state.
    pub const fn as_jail(&self) -> Option<&Jail> {
        match self {
            Self::Jail(j) => Some(j),
            _ => None,
        }
    }

    /// Mutably borrow the jail state.
    pub const fn as_jail_mut(&mut self) -> Option<&mut Jail> {
        match self {
            Self::Jail(j) => Some(j),
            _ => None,
        }
    }

    /// Borrow the projectile state.
    pub const fn as_fire_shot(&self) -> Option<&FireShot> {
        match self {
            Self::FireShot(s) => Some(s),
            _ => None,
        }
    }

    /// Mutably borrow the projectile state.
    pub const fn as_fire_shot_mut(&mut self) -> Option<&mut FireShot> {
        match self {
            Self::FireShot(s) => Some(s),
            _ => None,
        }
    }
}

/// Initial heading for a mobile entity of `side`: away from its own edge.
pub const fn facing(side: Side) -> Direction {
    match side {
        Side::Left => Direction::EAST,
        Side::Right => Direction::WEST,
    }
}
