use chrono::Local;
use serde_json::json;

use crate::devices::{BigTankInventory, Snapshot, TankGauge, TankId};

pub trait SnapshotFormatter: Send {
    fn format_snapshot(&self, snapshot: &Snapshot, stale: bool) -> String;
    fn format_unavailable(&self) -> String;
    fn format_header(&self) -> String;
}

pub struct ConsoleFormatter;

impl ConsoleFormatter {
    fn format_tank(&self, snapshot: &Snapshot, tank: TankId) -> String {
        let Some(reading) = snapshot.get(tank) else {
            return format!("{:<16} --\n", tank.to_string());
        };
        let gauge = TankGauge::new(tank.definition(), reading.gallons);
        let mut line = format!(
            "{:<16} {:>10} gal  {:>5.1}%  {} ft {} in\n",
            tank.to_string(),
            reading.gallons.trunc() as i64,
            gauge.percent_full,
            gauge.height_feet,
            gauge.height_inches
        );

        if tank == TankId::Big {
            let inventory = BigTankInventory::new(reading.gallons);
            line.push_str(&format!(
                "    Usable Gallons: {}  Barrels: {}  ROOM SHEET in BBLs = {}\n",
                inventory.usable_gallons, inventory.barrels, inventory.room_sheet_bbls
            ));
        }
        line
    }
}

impl SnapshotFormatter for ConsoleFormatter {
    fn format_snapshot(&self, snapshot: &Snapshot, stale: bool) -> String {
        let mut output = self.format_header();
        output.push_str(&"═".repeat(60));
        output.push('\n');

        if stale {
            output.push_str("⚠️  Data may be stale\n");
        }

        for tank in TankId::ALL {
            output.push_str(&self.format_tank(snapshot, tank));
        }

        output.push_str(&format!(
            "Last update: {}\n",
            snapshot.taken_at().format("%Y-%m-%d %H:%M:%S")
        ));
        output
    }

    fn format_unavailable(&self) -> String {
        format!("{}📵 No tank data received yet\n", self.format_header())
    }

    fn format_header(&self) -> String {
        format!("⛽ Fuel Terminal Tank Levels - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

pub struct JsonFormatter;

impl SnapshotFormatter for JsonFormatter {
    fn format_snapshot(&self, snapshot: &Snapshot, stale: bool) -> String {
        let tanks: Vec<_> = snapshot
            .iter()
            .map(|reading| {
                json!({
                    "tank": reading.tank,
                    "name": reading.tank.definition().name,
                    "gallons": reading.gallons,
                    "gauge": TankGauge::new(reading.tank.definition(), reading.gallons),
                })
            })
            .collect();

        let result = json!({
            "timestamp": snapshot.taken_at().to_rfc3339(),
            "stale": stale,
            "tanks": tanks,
            "big_tank": snapshot.gallons(TankId::Big).map(BigTankInventory::new),
        });

        serde_json::to_string(&result).unwrap_or_default()
    }

    fn format_unavailable(&self) -> String {
        json!({ "timestamp": Local::now().to_rfc3339(), "stale": true, "tanks": [] }).to_string()
    }

    fn format_header(&self) -> String {
        String::new() // JSON doesn't need headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{RawReading, TelemetryTransformer};

    fn snapshot() -> Snapshot {
        let now = Local::now();
        let measured = TelemetryTransformer::measured(&RawReading([32768, 10000, 5000]));
        Snapshot::new(now, TelemetryTransformer::tank_readings(&measured, now))
    }

    #[test]
    fn test_console_lists_every_tank() {
        let text = ConsoleFormatter.format_snapshot(&snapshot(), false);

        for tank in TankId::ALL {
            assert!(text.contains(tank.definition().name));
        }
        assert!(text.contains("ROOM SHEET in BBLs = 5567"));
        assert!(!text.contains("stale"));
    }

    #[test]
    fn test_console_marks_stale() {
        let text = ConsoleFormatter.format_snapshot(&snapshot(), true);
        assert!(text.contains("Data may be stale"));
    }

    #[test]
    fn test_json_shape() {
        let text = JsonFormatter.format_snapshot(&snapshot(), false);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["stale"], false);
        assert_eq!(value["tanks"].as_array().unwrap().len(), 6);
        assert_eq!(value["tanks"][3]["tank"], "tank3");
        assert_eq!(value["tanks"][3]["gallons"], 1333.54);
        assert_eq!(value["big_tank"]["barrels"], 6928);
    }
}
