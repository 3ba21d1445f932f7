//! Row flattener: one comma-separated row per packet with a fixed column
//! count.
//!
//! ```text
//! EventKind,time,posX,posZ,yaw,{id,category,posX,posY,posZ,dist,align} x N
//! ```
//!
//! Unused POI slots are written as seven empty fields, so every row has
//! `5 + 7 * N` columns.

use crate::telemetry::{EventPacket, PoiSnapshot};

/// Columns before the first POI block.
pub const PREFIX_COLUMNS: usize = 5;
/// Columns per POI block.
pub const POI_COLUMNS: usize = 7;

const PREFIX_HEADER: [&str; PREFIX_COLUMNS] = ["event", "time", "pos_x", "pos_z", "yaw"];
const POI_HEADER: [&str; POI_COLUMNS] = ["id", "category", "x", "y", "z", "dist", "align"];

pub fn column_count(slots: usize) -> usize {
    PREFIX_COLUMNS + POI_COLUMNS * slots
}

/// Flatten `packet` into `slots` POI blocks. Snapshots past `slots` are not
/// written.
pub fn flatten(packet: &EventPacket, slots: usize) -> String {
    let o = packet.observer();
    let mut cols: Vec<String> = Vec::with_capacity(column_count(slots));

    cols.push(packet.kind().as_str().to_owned());
    cols.push(format!("{:.3}", o.elapsed));
    cols.push(format!("{:.3}", o.position.x));
    cols.push(format!("{:.3}", o.position.z));
    cols.push(format!("{:.1}", o.yaw));

    for slot in 0..slots {
        match packet.pois().get(slot) {
            Some(poi) => push_poi(&mut cols, poi),
            None => cols.extend((0..POI_COLUMNS).map(|_| String::new())),
        }
    }

    cols.join(",")
}

fn push_poi(cols: &mut Vec<String>, poi: &PoiSnapshot) {
    cols.push(poi.identity.map(|id| id.to_string()).unwrap_or_default());
    cols.push(poi.category.as_str().to_owned());
    cols.push(format!("{:.3}", poi.position.x));
    cols.push(format!("{:.3}", poi.position.y));
    cols.push(format!("{:.3}", poi.position.z));
    cols.push(format!("{:.3}", poi.distance));
    cols.push(format!("{:.3}", poi.alignment));
}

/// Column names for a `slots`-wide row, POI columns suffixed with their
/// 1-based slot (`id_1`, `category_1`, ...).
pub fn header(slots: usize) -> String {
    let mut cols: Vec<String> = PREFIX_HEADER.iter().map(|s| s.to_string()).collect();
    for slot in 1..=slots {
        cols.extend(POI_HEADER.iter().map(|name| format!("{name}_{slot}")));
    }
    cols.join(",")
}
