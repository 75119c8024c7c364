use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<[u8; 3]> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Class colours: semantic class id → RGB
// ---------------------------------------------------------------------------

/// Colour of every semantic class. Classes the dataset config gives no
/// colour get one from [`generate_palette`].
#[derive(Debug, Clone, Default)]
pub struct ClassColors {
    mapping: BTreeMap<u32, [u8; 3]>,
}

pub const DEFAULT_COLOR: [u8; 3] = [160, 160, 160];

impl ClassColors {
    pub fn new(classes: &BTreeMap<u32, String>, configured: &BTreeMap<u32, [u8; 3]>) -> Self {
        let missing: Vec<u32> = classes
            .keys()
            .filter(|id| !configured.contains_key(id))
            .copied()
            .collect();
        let mut mapping: BTreeMap<u32, [u8; 3]> = classes
            .keys()
            .filter_map(|id| configured.get(id).map(|c| (*id, *c)))
            .collect();
        mapping.extend(missing.into_iter().zip(generate_palette(classes.len())));
        ClassColors { mapping }
    }

    pub fn rgb(&self, class: u32) -> [u8; 3] {
        self.mapping.get(&class).copied().unwrap_or(DEFAULT_COLOR)
    }

    pub fn color32(&self, class: u32) -> Color32 {
        let [r, g, b] = self.rgb(class);
        Color32::from_rgb(r, g, b)
    }

    /// Colour for the static PNG charts.
    pub fn plot_color(&self, class: u32) -> plotters::style::RGBColor {
        let [r, g, b] = self.rgb(class);
        plotters::style::RGBColor(r, g, b)
    }

    pub fn to_map(&self) -> BTreeMap<u32, [u8; 3]> {
        self.mapping.clone()
    }
}

impl From<BTreeMap<u32, [u8; 3]>> for ClassColors {
    fn from(mapping: BTreeMap<u32, [u8; 3]>) -> Self {
        ClassColors { mapping }
    }
}
