//! Wistia color ramp (matplotlib's `Wistia`), sampled through a 256-entry
//! lookup table the same way matplotlib samples it.

/// Anchor positions and colors: #e4ff7a, #ffe81a, #ffbd00, #ffa000, #fc7f00.
const WISTIA: [(f64, [u8; 3]); 5] = [
    (0.0, [0xe4, 0xff, 0x7a]),
    (0.25, [0xff, 0xe8, 0x1a]),
    (0.5, [0xff, 0xbd, 0x00]),
    (0.75, [0xff, 0xa0, 0x00]),
    (1.0, [0xfc, 0x7f, 0x00]),
];

const LUT_SIZE: usize = 256;

/// RGBA bytes for `x` in [0, 1]. Values outside clamp to the ends; NaN is
/// transparent.
pub fn wistia(x: f64) -> [u8; 4] {
    if x.is_nan() {
        return [0, 0, 0, 0];
    }

    let idx = ((x.clamp(0.0, 1.0) * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1);
    let pos = idx as f64 / (LUT_SIZE - 1) as f64;

    let k = WISTIA
        .windows(2)
        .position(|w| pos <= w[1].0)
        .unwrap_or(WISTIA.len() - 2);
    let (x0, c0) = WISTIA[k];
    let (x1, c1) = WISTIA[k + 1];
    let t = (pos - x0) / (x1 - x0);

    let mut rgba = [255u8; 4];
    for ch in 0..3 {
        let lo = c0[ch] as f64 / 255.0;
        let hi = c1[ch] as f64 / 255.0;
        rgba[ch] = (255.0 * (lo + (hi - lo) * t)) as u8;
    }
    rgba
}
