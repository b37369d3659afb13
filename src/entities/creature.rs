use crate::world::position::Direction;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(pub u32);

impl CreatureId {
    pub const INVALID: CreatureId = CreatureId(0);

    /// Allocates a fresh id from the process-wide allocator.
    pub fn next() -> Self {
        CREATURE_IDS.allocate()
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// First id handed out after startup.
pub const FIRST_CREATURE_ID: u32 = 0x4713;

/// Monotonic id source. Allocation is a single atomic increment so any network
/// thread may spawn; `CreatureId::INVALID` is skipped if the counter wraps.
#[derive(Debug)]
pub struct CreatureIdAllocator {
    next: AtomicU32,
}

impl CreatureIdAllocator {
    pub const fn new(start: u32) -> Self {
        Self {
            next: AtomicU32::new(start),
        }
    }

    pub fn allocate(&self) -> CreatureId {
        loop {
            let id = CreatureId(self.next.fetch_add(1, Ordering::Relaxed));
            if id.is_valid() {
                return id;
            }
        }
    }
}

static CREATURE_IDS: CreatureIdAllocator = CreatureIdAllocator::new(FIRST_CREATURE_ID);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outfit {
    pub look_type: u16,
    pub head: u8,
    pub body: u8,
    pub legs: u8,
    pub feet: u8,
}

pub const DEFAULT_OUTFIT: Outfit = Outfit {
    look_type: 128,
    head: 20,
    body: 30,
    legs: 40,
    feet: 50,
};

impl Default for Outfit {
    fn default() -> Self {
        DEFAULT_OUTFIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Light {
    pub color: u8,
    pub level: u8,
}

pub const DEFAULT_HEALTH: u16 = 100;
pub const DEFAULT_SPEED: u16 = 900;
pub const DEFAULT_STEP_SPEED: u16 = 220;

/// Diagonal steps take this many times longer than straight ones.
const DIAGONAL_STEP_FACTOR: u64 = 3;

#[derive(Debug, Clone)]
pub struct Creature {
    id: CreatureId,
    pub name: String,
    pub direction: Direction,
    pub health: u16,
    pub max_health: u16,
    pub speed: u16,
    pub step_speed: u16,
    pub light: Light,
    pub outfit: Outfit,
}

impl Creature {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(CreatureId::next(), name)
    }

    pub fn with_id(id: CreatureId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            direction: Direction::South,
            health: DEFAULT_HEALTH,
            max_health: DEFAULT_HEALTH,
            speed: DEFAULT_SPEED,
            step_speed: DEFAULT_STEP_SPEED,
            light: Light::default(),
            outfit: DEFAULT_OUTFIT,
        }
    }

    pub fn id(&self) -> CreatureId {
        self.id
    }

    pub fn health_percent(&self) -> u8 {
        if self.max_health == 0 {
            return 0;
        }
        (u32::from(self.health) * 100 / u32::from(self.max_health)).min(100) as u8
    }

    /// Time one step onto ground with `ground_speed` takes this creature.
    pub fn step_duration(&self, ground_speed: u16, direction: Direction) -> Duration {
        let mut ground_speed = u64::from(ground_speed.max(1));
        if direction.is_diagonal() {
            ground_speed = ground_speed.saturating_mul(DIAGONAL_STEP_FACTOR);
        }
        let step_speed = u64::from(self.step_speed.max(1));
        Duration::from_millis((ground_speed.saturating_mul(1000) / step_speed).max(1))
    }
}

impl PartialEq for Creature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Creature {}
