//! Pixel-sampling screen classifier.
//!
//! Pixels inside the central window are bucketed as black, blue, green or
//! other. A mostly black window cannot be told apart from a frozen dark
//! picture from one sample, so [`FrameClassifier::assess`] returns
//! [`Assessment::NeedsFrozenCheck`] and the caller compares a second sample
//! with [`FrameClassifier::compare_frames`].

use tracing::debug;

use crate::frame::Frame;
use crate::models::ScreenVerdict;

const DARK_CHANNEL_MAX: u8 = 35;
const BLUE_CHANNEL_MIN: u8 = 200;
const BLACK_PERCENT: u64 = 95;
const BLUE_PERCENT: u64 = 95;
const GREEN_PERCENT: u64 = 50;
const GREEN_CERTAIN_PERCENT: u64 = 85;
const FULL_FRAME_GREEN_PERCENT: u64 = 70;
const FROZEN_PIXEL_DIFF: u32 = 6;

/// Outcome of classifying a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Final verdict
    Verdict(ScreenVerdict),
    /// Mostly black; a second sample decides between `Black` and `Normal`
    NeedsFrozenCheck,
}

/// Bucket shares of the central window, in integer percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    /// Pixels sampled
    pub sampled: u64,
    /// Share of black pixels
    pub black_percent: u64,
    /// Share of blue pixels
    pub blue_percent: u64,
    /// Share of green pixels
    pub green_percent: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Black,
    Blue,
    Green,
    Other,
}

fn bucket([red, green, blue]: [u8; 3]) -> Bucket {
    if red <= DARK_CHANNEL_MAX && green <= DARK_CHANNEL_MAX {
        if blue > BLUE_CHANNEL_MIN {
            Bucket::Blue
        } else if blue <= DARK_CHANNEL_MAX {
            Bucket::Black
        } else {
            Bucket::Other
        }
    } else if blue < 10 && red < 10 && green > 40 {
        Bucket::Green
    } else {
        Bucket::Other
    }
}

fn washed_green([red, green, blue]: [u8; 3]) -> bool {
    (blue < 10 && red < 10 && green > 40)
        || (blue < 60 && green > 150)
        || (blue < 40 && red < 40 && green > 100)
}

const fn percent(count: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        count * 100 / total
    }
}

/// Stateless screen classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClassifier;

impl FrameClassifier {
    /// Create a classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Bucket the central window of `frame`.
    #[must_use]
    pub fn window_stats(&self, frame: &Frame) -> WindowStats {
        let (mut sampled, mut black, mut blue, mut green) = (0_u64, 0_u64, 0_u64, 0_u64);
        for pixel in frame.window_pixels() {
            sampled += 1;
            match bucket(pixel) {
                Bucket::Black => black += 1,
                Bucket::Blue => blue += 1,
                Bucket::Green => green += 1,
                Bucket::Other => {}
            }
        }

        WindowStats {
            sampled,
            black_percent: percent(black, sampled),
            blue_percent: percent(blue, sampled),
            green_percent: percent(green, sampled),
        }
    }

    /// Classify one frame.
    #[must_use]
    pub fn assess(&self, frame: &Frame) -> Assessment {
        let stats = self.window_stats(frame);
        debug!(
            sampled = stats.sampled,
            black = stats.black_percent,
            blue = stats.blue_percent,
            green = stats.green_percent,
            "Classified central window"
        );

        if stats.sampled == 0 {
            return Assessment::Verdict(ScreenVerdict::Normal);
        }
        if stats.black_percent > BLACK_PERCENT {
            return Assessment::NeedsFrozenCheck;
        }
        if stats.blue_percent > BLUE_PERCENT {
            return Assessment::Verdict(ScreenVerdict::Blue);
        }
        if stats.green_percent > GREEN_PERCENT {
            if stats.green_percent >= GREEN_CERTAIN_PERCENT || self.full_frame_green(frame) {
                return Assessment::Verdict(ScreenVerdict::Green);
            }
            return Assessment::Verdict(ScreenVerdict::Normal);
        }
        Assessment::Verdict(ScreenVerdict::Normal)
    }

    /// Whether more than 70% of the whole frame is washed green.
    #[must_use]
    pub fn full_frame_green(&self, frame: &Frame) -> bool {
        let total = frame.pixel_count();
        let green = frame.all_pixels().filter(|pixel| washed_green(*pixel)).count() as u64;
        let share = percent(green, total);
        debug!(green = share, "Full-frame green share");
        share > FULL_FRAME_GREEN_PERCENT
    }

    /// Compare two samples of a mostly black screen.
    ///
    /// `Normal` if the dimensions differ or any window pixel moved by more
    /// than 6 summed channel levels, otherwise `Black`.
    #[must_use]
    pub fn compare_frames(&self, first: &Frame, second: &Frame) -> ScreenVerdict {
        if !first.same_dimensions(second) {
            debug!("Frame dimensions changed between samples");
            return ScreenVerdict::Normal;
        }

        let moved = first.central_window().coordinates().any(|(x, y)| {
            let a = first.pixel(x, y);
            let b = second.pixel(x, y);
            let diff: u32 = a
                .iter()
                .zip(b.iter())
                .map(|(l, r)| u32::from(l.abs_diff(*r)))
                .sum();
            diff > FROZEN_PIXEL_DIFF
        });

        if moved {
            ScreenVerdict::Normal
        } else {
            ScreenVerdict::Black
        }
    }
}
