use serde::{Deserialize, Serialize};

/// 8-bit RGB triple, serialized as `[r, g, b]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Rgb::new(r, g, b)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        c.to_array()
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Default dataset palette.
pub const PALETTE: [Rgb; 6] = [
    Rgb::new(18, 147, 154),
    Rgb::new(221, 178, 124),
    Rgb::new(134, 172, 150),
    Rgb::new(136, 85, 174),
    Rgb::new(241, 92, 23),
    Rgb::new(32, 92, 170),
];

/// Picks a palette entry from a stable key so the same key always gets the same color.
pub fn palette_color(key: &str) -> Rgb {
    // FNV-1a; only needs to be stable, not strong.
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in key.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    PALETTE[(h % PALETTE.len() as u64) as usize]
}

#[cfg(test)]
mod tests {
    use super::{palette_color, Rgb, PALETTE};

    #[test]
    fn serializes_as_triple() {
        let c = Rgb::new(1, 2, 255);
        assert_eq!(serde_json::to_string(&c).unwrap(), "[1,2,255]");
        let back: Rgb = serde_json::from_str("[1,2,255]").unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(Rgb::new(255, 0, 16).to_string(), "#ff0010");
    }

    #[test]
    fn palette_color_is_stable_and_from_palette() {
        let a = palette_color("earthquakes");
        assert_eq!(a, palette_color("earthquakes"));
        assert!(PALETTE.contains(&a));
    }
}
