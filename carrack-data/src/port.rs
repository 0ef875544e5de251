use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

pub type Leagues = f64;

pub const NB_PORTS: usize = 7;

// Pairwise sailing distances, in leagues. One league is one day of
// sailing at reference speed 1.0. Indexed by declaration order.
const DISTANCES: [[Leagues; NB_PORTS]; NB_PORTS] = [
    [0.0, 2.0, 6.0, 22.0, 28.0, 33.0, 36.0],
    [2.0, 0.0, 6.0, 23.0, 29.0, 34.0, 37.0],
    [6.0, 6.0, 0.0, 17.0, 23.0, 28.0, 32.0],
    [22.0, 23.0, 17.0, 0.0, 7.0, 12.0, 16.0],
    [28.0, 29.0, 23.0, 7.0, 0.0, 6.0, 10.0],
    [33.0, 34.0, 28.0, 12.0, 6.0, 0.0, 4.0],
    [36.0, 37.0, 32.0, 16.0, 10.0, 4.0, 0.0],
];

#[derive(
    EnumIter,
    EnumString,
    IntoStaticStr,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
)]
#[strum(ascii_case_insensitive)]
pub enum Port {
    Lisbon,
    Seville,
    CapeVerde,
    Goa,
    Malacca,
    Macau,
    Nagasaki,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum PortSize {
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl PortSize {
    // Ceiling on the stock of every good sold at a port of this size
    pub fn max_stock(&self) -> u32 {
        match self {
            PortSize::Small => 30,
            PortSize::Medium => 60,
            PortSize::Large => 100,
            PortSize::VeryLarge => 150,
        }
    }

    // Units of each good restocked per day spent in harbour
    pub fn refresh_rate(&self) -> u32 {
        match self {
            PortSize::Small => 3,
            PortSize::Medium => 5,
            PortSize::Large => 8,
            PortSize::VeryLarge => 12,
        }
    }
}

impl Port {
    pub fn size(&self) -> PortSize {
        match self {
            Port::Lisbon => PortSize::Large,
            Port::Seville => PortSize::Medium,
            Port::CapeVerde => PortSize::Small,
            Port::Goa => PortSize::VeryLarge,
            Port::Malacca => PortSize::Large,
            Port::Macau => PortSize::Medium,
            Port::Nagasaki => PortSize::Small,
        }
    }

    pub fn distance_to(&self, other: Port) -> Leagues {
        DISTANCES[*self as usize][other as usize]
    }

    // Position on the map canvas, display only
    pub fn map_coords(&self) -> (u32, u32) {
        match self {
            Port::Lisbon => (95, 120),
            Port::Seville => (110, 135),
            Port::CapeVerde => (60, 260),
            Port::Goa => (590, 280),
            Port::Malacca => (680, 340),
            Port::Macau => (730, 250),
            Port::Nagasaki => (780, 175),
        }
    }
}

#[test]
fn test_distances_symmetric() {
    use strum::IntoEnumIterator;
    for a in Port::iter() {
        assert_eq!(a.distance_to(a), 0.0);
        for b in Port::iter() {
            assert_eq!(a.distance_to(b), b.distance_to(a));
            if a != b {
                assert!(a.distance_to(b) > 0.0);
            }
        }
    }
}

#[test]
fn test_port_from_str() {
    use std::str::FromStr;
    assert_eq!(Port::from_str("lisbon").unwrap(), Port::Lisbon);
    assert_eq!(Port::from_str("CAPEVERDE").unwrap(), Port::CapeVerde);
    assert!(Port::from_str("atlantis").is_err());
}
