//! Tone and colour adjustments
//!
//! Applies the six [`Adjustments`] sliders to developed RGB pixel data.
//!
//! ## Adjustment Order
//! 1. Exposure
//! 2. Contrast
//! 3. Temperature
//! 4. Highlights
//! 5. Shadows
//! 6. Saturation

use crate::Adjustments;

/// Apply adjustments to an image's pixel data in place.
///
/// # Arguments
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `adjustments` - The adjustment values to apply, clamped to their ranges
///
/// Trailing bytes that do not form a whole pixel are left untouched.
pub fn apply_adjustments(pixels: &mut [u8], adjustments: &Adjustments) {
    if adjustments.is_default() {
        return;
    }
    let adj = adjustments.clamped();

    for chunk in pixels.chunks_exact_mut(3) {
        let mut r = chunk[0] as f32 / 255.0;
        let mut g = chunk[1] as f32 / 255.0;
        let mut b = chunk[2] as f32 / 255.0;

        (r, g, b) = apply_exposure(r, g, b, adj.exposure);
        (r, g, b) = apply_contrast(r, g, b, adj.contrast);
        (r, g, b) = apply_temperature(r, g, b, adj.temperature);

        let luminance = luminance(r, g, b);
        (r, g, b) = apply_highlights(r, g, b, luminance, adj.highlights);
        (r, g, b) = apply_shadows(r, g, b, luminance, adj.shadows);
        (r, g, b) = apply_saturation(r, g, b, adj.saturation);

        chunk[0] = to_byte(r);
        chunk[1] = to_byte(g);
        chunk[2] = to_byte(b);
    }
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Exposure in stops: `output = input * 2^exposure`.
#[inline]
fn apply_exposure(r: f32, g: f32, b: f32, exposure: f32) -> (f32, f32, f32) {
    if exposure == 0.0 {
        return (r, g, b);
    }
    let multiplier = 2.0_f32.powf(exposure);
    (r * multiplier, g * multiplier, b * multiplier)
}

/// Contrast around mid grey: `output = (input - 0.5) * (1 + contrast/100) + 0.5`.
#[inline]
fn apply_contrast(r: f32, g: f32, b: f32, contrast: f32) -> (f32, f32, f32) {
    if contrast == 0.0 {
        return (r, g, b);
    }
    let factor = 1.0 + contrast / 100.0;
    (
        (r - 0.5) * factor + 0.5,
        (g - 0.5) * factor + 0.5,
        (b - 0.5) * factor + 0.5,
    )
}

/// Negative values warm the image (red up, blue down), positive values cool it.
#[inline]
fn apply_temperature(r: f32, g: f32, b: f32, temperature: f32) -> (f32, f32, f32) {
    if temperature == 0.0 {
        return (r, g, b);
    }
    let shift = temperature / 100.0 * 0.3;
    (r * (1.0 - shift), g, b * (1.0 + shift))
}

/// ITU-R BT.709 luminance.
#[inline]
fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Scale or lift a tonal band selected by `mask` (0..=1).
#[inline]
fn apply_tonal(r: f32, g: f32, b: f32, mask: f32, amount: f32) -> (f32, f32, f32) {
    let adjustment = amount / 100.0 * mask;
    if amount < 0.0 {
        let factor = 1.0 + adjustment;
        (r * factor, g * factor, b * factor)
    } else {
        let boost = adjustment * 0.5;
        (r + boost, g + boost, b + boost)
    }
}

/// Affects bright areas only (luminance above 0.5).
#[inline]
fn apply_highlights(r: f32, g: f32, b: f32, luminance: f32, highlights: f32) -> (f32, f32, f32) {
    if highlights == 0.0 {
        return (r, g, b);
    }
    apply_tonal(r, g, b, smoothstep(0.5, 1.0, luminance), highlights)
}

/// Affects dark areas only (luminance below 0.5).
#[inline]
fn apply_shadows(r: f32, g: f32, b: f32, luminance: f32, shadows: f32) -> (f32, f32, f32) {
    if shadows == 0.0 {
        return (r, g, b);
    }
    apply_tonal(r, g, b, smoothstep(0.5, 0.0, luminance), shadows)
}

/// -100 collapses to luminance grey, positive values push channels apart.
#[inline]
fn apply_saturation(r: f32, g: f32, b: f32, saturation: f32) -> (f32, f32, f32) {
    if saturation == 0.0 {
        return (r, g, b);
    }
    let gray = luminance(r, g, b);
    let factor = 1.0 + saturation / 100.0;
    (
        gray + (r - gray) * factor,
        gray + (g - gray) * factor,
        gray + (b - gray) * factor,
    )
}
