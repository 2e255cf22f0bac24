use serde::{Deserialize, Serialize};
use std::fmt;

/// Display order of the terminal's tanks. `Ord` follows this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TankId {
    Big,
    Tank1,
    Tank2,
    Tank3,
    Tank4,
    Tank5,
}

/// Where a displayed tank gets its level from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TankSource {
    /// Offset into the three-register block.
    Register(usize),
    /// Copy of another tank's reading from the same cycle.
    Mirror(TankId),
}

impl TankId {
    pub const ALL: [TankId; 6] = [
        TankId::Big,
        TankId::Tank1,
        TankId::Tank2,
        TankId::Tank3,
        TankId::Tank4,
        TankId::Tank5,
    ];

    /// Tanks with their own sensor, in register order.
    pub const MEASURED: [TankId; 3] = [TankId::Big, TankId::Tank1, TankId::Tank2];

    pub fn key(self) -> &'static str {
        match self {
            TankId::Big => "big",
            TankId::Tank1 => "tank1",
            TankId::Tank2 => "tank2",
            TankId::Tank3 => "tank3",
            TankId::Tank4 => "tank4",
            TankId::Tank5 => "tank5",
        }
    }

    // Tanks 3-5 have no wiring of their own.
    pub fn source(self) -> TankSource {
        match self {
            TankId::Big => TankSource::Register(0),
            TankId::Tank1 => TankSource::Register(1),
            TankId::Tank2 => TankSource::Register(2),
            TankId::Tank3 => TankSource::Mirror(TankId::Tank2),
            TankId::Tank4 => TankSource::Mirror(TankId::Tank1),
            TankId::Tank5 => TankSource::Mirror(TankId::Tank1),
        }
    }

    pub fn definition(self) -> &'static TankDefinition {
        // TANKS is declared in the same order as the enum.
        &TANKS[self as usize]
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.definition().name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TankDefinition {
    pub id: TankId,
    pub name: &'static str,
    pub product: &'static str,
    pub capacity_gallons: f64,
    pub height_feet: f64,
}

pub const TANKS: [TankDefinition; 6] = [
    TankDefinition {
        id: TankId::Big,
        name: "Big Tank",
        product: "Diesel",
        capacity_gallons: 582000.0,
        height_feet: 52.6,
    },
    TankDefinition {
        id: TankId::Tank1,
        name: "Tank 1 - Bio",
        product: "Bio",
        capacity_gallons: 20000.0,
        height_feet: 25.0,
    },
    TankDefinition {
        id: TankId::Tank2,
        name: "Tank 2 - Fleet",
        product: "Fleet",
        capacity_gallons: 17478.68,
        height_feet: 31.0,
    },
    TankDefinition {
        id: TankId::Tank3,
        name: "Tank 3 - Fleet",
        product: "Fleet",
        capacity_gallons: 17478.68,
        height_feet: 31.0,
    },
    TankDefinition {
        id: TankId::Tank4,
        name: "Tank 4 - Bio",
        product: "Bio",
        capacity_gallons: 20000.0,
        height_feet: 25.0,
    },
    TankDefinition {
        id: TankId::Tank5,
        name: "Tank 5 - Bio",
        product: "Bio",
        capacity_gallons: 20000.0,
        height_feet: 25.0,
    },
];
