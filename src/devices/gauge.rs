use serde::Serialize;

use super::tanks::{TankDefinition, TankId};

/// Unpumpable bottom volume of the Big Tank, in gallons.
pub const BIG_TANK_HEEL: f64 = 21266.0;
pub const GALLONS_PER_BBL: i64 = 42;
/// Usable Big Tank capacity the room sheet is measured against, in barrels.
pub const USABLE_CAPACITY_BBLS: i64 = 12495;

/// Display-side figures derived from one tank's level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TankGauge {
    pub tank: TankId,
    pub gallons: f64,
    /// Fill percentage clamped to 0..=100.
    pub percent_full: f64,
    pub height_feet: i64,
    pub height_inches: i64,
}

impl TankGauge {
    pub fn new(definition: &TankDefinition, gallons: f64) -> Self {
        let fraction = gallons / definition.capacity_gallons;
        let total_feet = fraction * definition.height_feet;
        let feet = total_feet.trunc();
        let inches = ((total_feet - feet) * 12.0).trunc();

        Self {
            tank: definition.id,
            gallons,
            percent_full: (fraction * 100.0).clamp(0.0, 100.0),
            height_feet: feet as i64,
            height_inches: inches as i64,
        }
    }
}

/// Big Tank inventory figures shown on the terminal board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BigTankInventory {
    pub total_gallons: i64,
    pub usable_gallons: i64,
    pub barrels: i64,
    pub room_sheet_bbls: i64,
}

impl BigTankInventory {
    pub fn new(gallons: f64) -> Self {
        let total_gallons = gallons.trunc() as i64;
        let barrels = total_gallons.div_euclid(GALLONS_PER_BBL);
        Self {
            total_gallons,
            usable_gallons: ((gallons - BIG_TANK_HEEL).trunc() as i64).max(0),
            barrels,
            room_sheet_bbls: (USABLE_CAPACITY_BBLS - barrels).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_height_and_percent() {
        let def = TankId::Tank1.definition(); // 20000 gal, 25 ft
        let gauge = TankGauge::new(def, 10000.0);

        assert_eq!(gauge.percent_full, 50.0);
        assert_eq!(gauge.height_feet, 12);
        assert_eq!(gauge.height_inches, 6);
    }

    #[test]
    fn test_gauge_percent_clamped() {
        let def = TankId::Tank2.definition();
        assert_eq!(TankGauge::new(def, def.capacity_gallons * 2.0).percent_full, 100.0);
        assert_eq!(TankGauge::new(def, -5.0).percent_full, 0.0);
    }

    #[test]
    fn test_big_tank_inventory() {
        let inventory = BigTankInventory::new(291004.44);

        assert_eq!(inventory.total_gallons, 291004);
        assert_eq!(inventory.usable_gallons, 269738);
        assert_eq!(inventory.barrels, 6928);
        assert_eq!(inventory.room_sheet_bbls, 12495 - 6928);
    }

    #[test]
    fn test_big_tank_inventory_floors_at_zero() {
        let empty = BigTankInventory::new(1000.0);
        assert_eq!(empty.usable_gallons, 0);

        let full = BigTankInventory::new(582000.0);
        assert_eq!(full.barrels, 13857);
        assert_eq!(full.room_sheet_bbls, 0);
    }
}
