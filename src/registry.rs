//! Static LIFX product catalog
//!
//! Maps product ids (as reported by `StateVersion`) to product names and
//! capability flags. The table is immutable process-wide state; devices
//! reporting an unknown pid keep default capabilities.

/// Color temperature range supported by a light, in Kelvin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureRange {
    pub min: u16,
    pub max: u16,
}

/// Capability flags for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features {
    pub color: bool,
    pub matrix: bool,
    pub multizone: bool,
    pub extended_multizone: bool,
    pub relays: bool,
    pub buttons: bool,
    pub temperature_range: Option<TemperatureRange>,
}

/// A catalog entry for one LIFX product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub pid: u32,
    pub name: &'static str,
    pub features: Features,
}

const fn white(min: u16, max: u16) -> Features {
    Features {
        color: false,
        matrix: false,
        multizone: false,
        extended_multizone: false,
        relays: false,
        buttons: false,
        temperature_range: Some(TemperatureRange { min, max }),
    }
}

const fn color(min: u16, max: u16) -> Features {
    let mut f = white(min, max);
    f.color = true;
    f
}

const fn multizone(min: u16, max: u16, extended: bool) -> Features {
    let mut f = color(min, max);
    f.multizone = true;
    f.extended_multizone = extended;
    f
}

const fn matrix(min: u16, max: u16) -> Features {
    let mut f = color(min, max);
    f.matrix = true;
    f
}

const fn hybrid_matrix(min: u16, max: u16) -> Features {
    let mut f = matrix(min, max);
    f.buttons = true;
    f
}

const fn relays() -> Features {
    Features {
        relays: true,
        buttons: true,
        color: false,
        matrix: false,
        multizone: false,
        extended_multizone: false,
        temperature_range: None,
    }
}

/// Known products, ordered by pid.
pub static PRODUCTS: &[Product] = &[
    Product { pid: 1, name: "LIFX Original 1000", features: color(2500, 9000) },
    Product { pid: 10, name: "LIFX White 800 (Low Voltage)", features: white(2700, 6500) },
    Product { pid: 22, name: "LIFX Color 1000", features: color(2500, 9000) },
    Product { pid: 27, name: "LIFX A19", features: color(2500, 9000) },
    Product { pid: 31, name: "LIFX Z", features: multizone(2500, 9000, false) },
    Product { pid: 32, name: "LIFX Z", features: multizone(2500, 9000, true) },
    Product { pid: 38, name: "LIFX Beam", features: multizone(2500, 9000, true) },
    Product { pid: 49, name: "LIFX Mini Color", features: color(1500, 9000) },
    Product { pid: 51, name: "LIFX Mini White", features: white(2700, 2700) },
    Product { pid: 55, name: "LIFX Tile", features: matrix(2500, 9000) },
    Product { pid: 57, name: "LIFX Candle", features: matrix(1500, 9000) },
    Product { pid: 68, name: "LIFX Candle", features: matrix(1500, 9000) },
    Product { pid: 81, name: "LIFX Candle White to Warm", features: white(2200, 6500) },
    Product { pid: 88, name: "LIFX Mini White", features: white(2700, 2700) },
    Product { pid: 89, name: "LIFX Switch", features: relays() },
    Product { pid: 97, name: "LIFX A19", features: color(1500, 9000) },
    Product { pid: 98, name: "LIFX BR30", features: color(1500, 9000) },
    Product { pid: 115, name: "LIFX Switch", features: relays() },
    Product { pid: 117, name: "LIFX Z US", features: multizone(1500, 9000, true) },
    Product { pid: 118, name: "LIFX Z Intl", features: multizone(1500, 9000, true) },
    Product { pid: 119, name: "LIFX Beam US", features: multizone(1500, 9000, true) },
    Product { pid: 161, name: "LIFX Outdoor Neon US", features: multizone(1500, 9000, true) },
    Product { pid: 181, name: "LIFX Colour US", features: color(1500, 9000) },
    Product { pid: 201, name: "LIFX Ceiling US", features: matrix(1500, 9000) },
    Product { pid: 214, name: "LIFX Neon US", features: multizone(1500, 9000, true) },
    Product { pid: 219, name: "LIFX Luna US", features: hybrid_matrix(1500, 9000) },
    Product { pid: 225, name: "LIFX Round Spot US", features: color(1500, 9000) },
];

/// Looks up a product by its id.
pub fn product_by_pid(pid: u32) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.pid == pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_products() {
        let tile = product_by_pid(55).unwrap();
        assert_eq!(tile.name, "LIFX Tile");
        assert!(tile.features.matrix);
        assert!(tile.features.color);
        assert_eq!(
            tile.features.temperature_range,
            Some(TemperatureRange { min: 2500, max: 9000 })
        );

        let switch = product_by_pid(89).unwrap();
        assert!(switch.features.relays);
        assert!(switch.features.temperature_range.is_none());

        let strip = product_by_pid(117).unwrap();
        assert!(strip.features.multizone);
        assert!(strip.features.extended_multizone);

        let luna = product_by_pid(219).unwrap();
        assert!(luna.features.matrix);
        assert!(luna.features.buttons);
    }

    #[test]
    fn test_lookup_unknown_product() {
        assert!(product_by_pid(0).is_none());
        assert!(product_by_pid(100_000).is_none());
    }

    #[test]
    fn test_table_sorted_by_pid() {
        for pair in PRODUCTS.windows(2) {
            assert!(pair[0].pid <= pair[1].pid);
        }
    }
}
