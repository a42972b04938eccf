//! WCAG color math and dominant color sampling

use std::collections::HashMap;

use image::RgbaImage;

use crate::imaging::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (the `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// WCAG relative luminance
    pub fn relative_luminance(&self) -> f64 {
        let linear = |channel: u8| {
            let c = channel as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * linear(self.r) + 0.7152 * linear(self.g) + 0.0722 * linear(self.b)
    }

    /// Snap each channel down to a multiple of `step`
    pub fn quantize(&self, step: u8) -> Self {
        let step = step.max(1);
        let snap = |c: u8| (c / step) * step;
        Self::new(snap(self.r), snap(self.g), snap(self.b))
    }
}

/// WCAG contrast ratio between two colors, in `[1, 21]`
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Contrast ratio between two hex colors, rounded to two decimals
pub fn calculate_contrast(foreground: &str, background: &str) -> Option<f64> {
    let ratio = contrast_ratio(Rgb::from_hex(foreground)?, Rgb::from_hex(background)?);
    Some((ratio * 100.0).round() / 100.0)
}

/// Options for counting colors in a region of an image
#[derive(Debug, Clone, Copy)]
pub struct SamplingOptions {
    pub quantization_step: u8,
    pub alpha_threshold: u8,
    /// Visit every Nth pixel along both axes
    pub stride: u32,
}

/// The two most frequent quantized colors in `region` (or the whole image),
/// most frequent first. `None` when fewer than two colors are visible.
pub fn dominant_colors(
    img: &RgbaImage,
    region: Option<BoundingBox>,
    options: SamplingOptions,
) -> Option<(Rgb, Rgb)> {
    let (width, height) = img.dimensions();
    let region = region
        .unwrap_or(BoundingBox::new(0, 0, width, height))
        .clamp_to(width, height);
    let stride = options.stride.max(1) as usize;

    let mut counts: HashMap<Rgb, usize> = HashMap::new();
    for y in (region.y0..region.y1).step_by(stride) {
        for x in (region.x0..region.x1).step_by(stride) {
            let [r, g, b, a] = img.get_pixel(x, y).0;
            if a < options.alpha_threshold {
                continue;
            }
            *counts
                .entry(Rgb::new(r, g, b).quantize(options.quantization_step))
                .or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(Rgb, usize)> = counts.into_iter().collect();
    // ties broken by color value so results are deterministic
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    match ranked.as_slice() {
        [first, second, ..] => Some((first.0, second.0)),
        _ => None,
    }
}
