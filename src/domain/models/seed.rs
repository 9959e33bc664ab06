//! Seed network loaded when the store holds no snapshot.

use super::junction::{Junction, JunctionId};
use super::snapshot::TrafficSnapshot;

/// Revision of the seed list. Bump when the junction set changes.
pub const SEED_VERSION: u32 = 1;

/// (id, name, latitude, longitude, starting flow)
const SEED_JUNCTIONS: [(u32, &str, f64, f64, u8); 26] = [
    (1, "Kalma Chowk", 31.5036, 74.3318, 85),
    (2, "Liberty Roundabout", 31.5112, 74.3436, 50),
    (3, "Thokar Niaz Baig", 31.4655, 74.2464, 15),
    (4, "Mall Road (Hall Rd)", 31.5612, 74.3195, 25),
    (5, "Garhi Shahu", 31.5644, 74.3533, 70),
    (6, "DHA Phase 5", 31.4589, 74.4022, 90),
    (7, "Hussain Chowk (MM Alam)", 31.5085, 74.3470, 55),
    (8, "Main Market Gulberg", 31.5207, 74.3462, 75),
    (9, "Shadman Chowk", 31.5363, 74.3338, 20),
    (10, "Qurtaba Chowk (Jail Rd)", 31.5375, 74.3218, 30),
    (11, "Ichra Market", 31.5284, 74.3214, 25),
    (12, "Muslim Town Mor", 31.5165, 74.3259, 80),
    (13, "Model Town Link Road", 31.4824, 74.3204, 60),
    (14, "General Hospital", 31.4721, 74.3468, 18),
    (15, "Campus Bridge", 31.4984, 74.3061, 88),
    (16, "Jinnah Hospital", 31.4867, 74.2952, 45),
    (17, "Doctors Hospital", 31.4764, 74.2810, 72),
    (18, "Expo Center", 31.4628, 74.2690, 95),
    (19, "Wapda Town Roundabout", 31.4398, 74.2709, 58),
    (20, "Valencia Main Chowk", 31.4235, 74.2612, 82),
    (21, "Fortress Stadium", 31.5247, 74.3705, 35),
    (22, "Bhatta Chowk", 31.4925, 74.4258, 12),
    (23, "Airport Ring Road Exit", 31.5178, 74.4029, 92),
    (24, "Azadi Chowk (Minar-e-Pakistan)", 31.5925, 74.3095, 10),
    (25, "Data Darbar", 31.5786, 74.3069, 22),
    (26, "Chauburji", 31.5564, 74.3039, 40),
];

/// Build the seed snapshot. Every junction starts AI-owned with its status
/// derived from its starting flow.
pub fn seed_snapshot() -> TrafficSnapshot {
    TrafficSnapshot::new(
        SEED_JUNCTIONS
            .iter()
            .map(|&(id, name, lat, lon, flow)| Junction::new(id, name, (lat, lon), flow))
            .collect(),
    )
}

/// Ids of the seed network, in seed order.
pub fn seed_junction_ids() -> impl Iterator<Item = JunctionId> {
    SEED_JUNCTIONS.iter().map(|&(id, ..)| id)
}
