use tables::{LAB_DELTA, SRGB_LINEAR_TBL, WHITE_D65};
pub(crate) mod tables {
    use static_init::dynamic;
    /// Reference white (D65, 2° observer).
    pub const WHITE_D65: [f32; 3] = [0.950_47, 1.0, 1.088_83];
    pub const LAB_DELTA: f32 = 6.0 / 29.0;
    #[dynamic(65535)]
    pub static SRGB_LINEAR_TBL: [f32; 256] = core::array::from_fn(|i| srgb_to_linear(i as u8));
    fn srgb_to_linear(a: u8) -> f32 {
        let v: f64 = a as f64 / 255.0;
        if v <= 0.04045 {
            return (v / 12.92) as f32;
        }
        ((v + 0.055) / 1.055).powf(2.4) as f32
    }
}

#[inline(always)]
fn lab_nonlin(t: f32) -> f32 {
    if t > LAB_DELTA * LAB_DELTA * LAB_DELTA {
        t.cbrt()
    } else {
        t / (3.0 * LAB_DELTA * LAB_DELTA) + 4.0 / 29.0
    }
}

#[inline(always)]
fn lab_nonlin_inv(u: f32) -> f32 {
    if u > LAB_DELTA {
        u * u * u
    } else {
        3.0 * LAB_DELTA * LAB_DELTA * (u - 4.0 / 29.0)
    }
}

#[inline(always)]
fn linear_to_srgb(c: f32) -> u8 {
    let v = if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert pixel in RGB24 to CIELAB (D65).
///
/// The output range is for:
///  - L - from 0 to 100
///  - a - roughly from -86 to 98
///  - b - roughly from -108 to 94
#[inline(always)]
pub fn srgb_to_cielab_pixel(rgb: &[u8]) -> [f32; 3] {
    let sr = unsafe { SRGB_LINEAR_TBL[rgb[0] as usize] };
    let sg = unsafe { SRGB_LINEAR_TBL[rgb[1] as usize] };
    let sb = unsafe { SRGB_LINEAR_TBL[rgb[2] as usize] };
    let x = 0.412_456_4 * sr + 0.357_576_1 * sg + 0.180_437_5 * sb;
    let y = 0.212_672_9 * sr + 0.715_152_2 * sg + 0.072_175 * sb;
    let z = 0.019_333_9 * sr + 0.119_192 * sg + 0.950_304_1 * sb;
    let fx = lab_nonlin(x / WHITE_D65[0]);
    let fy = lab_nonlin(y / WHITE_D65[1]);
    let fz = lab_nonlin(z / WHITE_D65[2]);
    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

/// Convert CIELAB (D65) color back to RGB24. Out-of-gamut colors are clamped.
#[inline(always)]
pub fn cielab_to_srgb_pixel(lab: &[f32]) -> [u8; 3] {
    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;
    let x = WHITE_D65[0] * lab_nonlin_inv(fx);
    let y = WHITE_D65[1] * lab_nonlin_inv(fy);
    let z = WHITE_D65[2] * lab_nonlin_inv(fz);
    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266 * x + 1.876_010_8 * y + 0.041_556 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;
    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b)]
}
