//! Per-day intensity and colour for the emotion map.

use serde::Serialize;
use tracing::trace;

use still_types::models::{DailyStatusCounts, StatusCounts, UrgeStatus};

/// Shown for days without any urges.
pub const EMPTY_COLOR: &str = "#e5e7eb";

const PEACEFUL_COLOR: Rgb = Rgb::from_hex(0x10b981);
const URGE_COLOR: Rgb = Rgb::from_hex(0xf59e0b);
const TOOK_OVER_COLOR: Rgb = Rgb::from_hex(0xef4444);

/// Daily total at which the colour reaches its darkest.
const LUMINANCE_SATURATION: f64 = 12.0;
/// Daily total at which the volume factor of the intensity is saturated.
const INTENSITY_SATURATION: f64 = 5.0;

pub fn status_weight(status: UrgeStatus) -> f64 {
    match status {
        UrgeStatus::Peaceful => 0.1,
        UrgeStatus::Pending => 0.3,
        UrgeStatus::Present => 0.7,
        UrgeStatus::Overcome => 1.0,
    }
}

/// Count-weighted mean of the status weights, blended 90/10 with how busy
/// the day was. Zero for a day without urges.
pub fn intensity(counts: &StatusCounts) -> f64 {
    let (weighted, seen) = UrgeStatus::ALL
        .iter()
        .map(|&status| (status, counts.get(status)))
        .filter(|&(_, n)| n > 0)
        .fold((0.0, 0u32), |(sum, seen), (status, n)| {
            (sum + f64::from(n) * status_weight(status), seen + n)
        });

    if seen == 0 {
        return 0.0;
    }

    let mean = weighted / f64::from(seen);
    let volume = (f64::from(counts.total) / INTENSITY_SATURATION).min(1.0);
    mean * 0.9 + volume * 0.1
}

/// Counts as the colour blend sees them. Pending and present both count as
/// the urge still being there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmotionCounts {
    pub peaceful: u32,
    pub urge: u32,
    pub took_over: u32,
}

impl EmotionCounts {
    pub fn total(&self) -> u32 {
        self.peaceful + self.urge + self.took_over
    }
}

impl From<&StatusCounts> for EmotionCounts {
    fn from(counts: &StatusCounts) -> Self {
        Self {
            peaceful: counts.peaceful,
            urge: counts.pending + counts.present,
            took_over: counts.overcome,
        }
    }
}

/// Green to amber by the share of urges among peaceful+urge, then toward red
/// by the share taken over, both in Lab. Busier days are darker.
pub fn emotion_color(counts: EmotionCounts) -> String {
    let total = counts.total();
    if total == 0 {
        return EMPTY_COLOR.to_string();
    }

    let calm_or_urge = counts.peaceful + counts.urge;
    let mut blend = PEACEFUL_COLOR;
    if calm_or_urge > 0 {
        blend = mix_lab(
            PEACEFUL_COLOR,
            URGE_COLOR,
            f64::from(counts.urge) / f64::from(calm_or_urge),
        );
    }
    let blend = mix_lab(
        blend,
        TOOK_OVER_COLOR,
        f64::from(counts.took_over) / f64::from(total),
    );

    let activity = (f64::from(total) / LUMINANCE_SATURATION).min(1.0);
    with_luminance(blend, 0.9 - activity * 0.6).hex()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayEmotion {
    pub date: String,
    pub intensity: f64,
    pub color: String,
}

pub fn process_emotion_data(daily: &[DailyStatusCounts]) -> Vec<DayEmotion> {
    daily
        .iter()
        .map(|day| {
            let emotion = DayEmotion {
                date: day.date.clone(),
                intensity: intensity(&day.counts),
                color: emotion_color(EmotionCounts::from(&day.counts)),
            };
            trace!(
                "{}: intensity {:.3}, color {}",
                emotion.date, emotion.intensity, emotion.color
            );
            emotion
        })
        .collect()
}

/// sRGB with unrounded 0..=255 channels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb {
    r: f64,
    g: f64,
    b: f64,
}

// D65 reference white and the CIE Lab constants.
const XN: f64 = 0.950_47;
const YN: f64 = 1.0;
const ZN: f64 = 1.088_83;
const T0: f64 = 4.0 / 29.0;
const T1: f64 = 6.0 / 29.0;
const T2: f64 = 3.0 * T1 * T1;
const T3: f64 = T1 * T1 * T1;

const LUMINANCE_EPSILON: f64 = 1e-7;
const LUMINANCE_MAX_STEPS: u32 = 20;

impl Rgb {
    const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    const WHITE: Rgb = Rgb { r: 255.0, g: 255.0, b: 255.0 };

    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f64,
            g: ((hex >> 8) & 0xff) as f64,
            b: (hex & 0xff) as f64,
        }
    }

    fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 255.0),
            g: self.g.clamp(0.0, 255.0),
            b: self.b.clamp(0.0, 255.0),
        }
    }

    fn hex(self) -> String {
        let c = self.clamped();
        format!(
            "#{:02x}{:02x}{:02x}",
            c.r.round() as u8,
            c.g.round() as u8,
            c.b.round() as u8
        )
    }

    fn lerp(self, other: Rgb, f: f64) -> Rgb {
        Rgb {
            r: self.r + f * (other.r - self.r),
            g: self.g + f * (other.g - self.g),
            b: self.b + f * (other.b - self.b),
        }
    }

    /// WCAG relative luminance.
    fn luminance(self) -> f64 {
        fn channel(v: f64) -> f64 {
            let v = v / 255.0;
            if v <= 0.039_28 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }

    fn to_lab(self) -> [f64; 3] {
        fn linear(v: f64) -> f64 {
            let v = v / 255.0;
            if v <= 0.040_45 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        }
        fn f(t: f64) -> f64 {
            if t > T3 { t.cbrt() } else { t / T2 + T0 }
        }

        let (r, g, b) = (linear(self.r), linear(self.g), linear(self.b));
        let x = f((0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / XN);
        let y = f((0.212_672_9 * r + 0.715_152_2 * g + 0.072_175_0 * b) / YN);
        let z = f((0.019_333_9 * r + 0.119_192_0 * g + 0.950_304_1 * b) / ZN);

        let l = (116.0 * y - 16.0).max(0.0);
        [l, 500.0 * (x - y), 200.0 * (y - z)]
    }

    fn from_lab([l, a, b]: [f64; 3]) -> Rgb {
        fn finv(t: f64) -> f64 {
            if t > T1 { t * t * t } else { T2 * (t - T0) }
        }
        fn gamma(v: f64) -> f64 {
            255.0
                * if v <= 0.003_04 {
                    12.92 * v
                } else {
                    1.055 * v.powf(1.0 / 2.4) - 0.055
                }
        }

        let fy = (l + 16.0) / 116.0;
        let x = XN * finv(fy + a / 500.0);
        let y = YN * finv(fy);
        let z = ZN * finv(fy - b / 200.0);

        Rgb {
            r: gamma(3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z),
            g: gamma(-0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z),
            b: gamma(0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z),
        }
        .clamped()
    }
}

fn mix_lab(from: Rgb, to: Rgb, f: f64) -> Rgb {
    let a = from.to_lab();
    let b = to.to_lab();
    Rgb::from_lab([
        a[0] + f * (b[0] - a[0]),
        a[1] + f * (b[1] - a[1]),
        a[2] + f * (b[2] - a[2]),
    ])
}

/// Bisect toward black or white in RGB until the relative luminance hits
/// `target`.
fn with_luminance(color: Rgb, target: f64) -> Rgb {
    if target <= 0.0 {
        return Rgb::BLACK;
    }
    if target >= 1.0 {
        return Rgb::WHITE;
    }

    let (mut low, mut high) = if color.luminance() > target {
        (Rgb::BLACK, color)
    } else {
        (color, Rgb::WHITE)
    };

    let mut mid = low.lerp(high, 0.5);
    for _ in 0..LUMINANCE_MAX_STEPS {
        let lum = mid.luminance();
        if (target - lum).abs() < LUMINANCE_EPSILON {
            break;
        }
        if lum > target {
            high = mid;
        } else {
            low = mid;
        }
        mid = low.lerp(high, 0.5);
    }
    mid
}
