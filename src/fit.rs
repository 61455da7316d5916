//! Fitting rendered pages into the printer's drawable area
//!
//! Decides whether a page raster has to be turned to match the sheet
//! orientation and computes the aspect-preserving rectangle it is drawn into.
//! All arithmetic is done on integers: ratios are compared by
//! cross-multiplication and the derived side is floored, so the binding side
//! always equals the drawable dimension exactly.

use serde::{Deserialize, Serialize};

/// Rectangle in device units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DrawableRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DrawableRect {
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True if `other`, taken relative to this rectangle's origin, lies inside it
    #[must_use]
    pub fn contains_relative(&self, other: &DrawableRect) -> bool {
        u64::from(other.x) + u64::from(other.width) <= u64::from(self.width)
            && u64::from(other.y) + u64::from(other.height) <= u64::from(self.height)
    }
}

/// Where the fitted image sits inside the drawable area
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Top-left corner of the drawable area; the shorter side is not letterboxed
    #[default]
    Origin,
    /// Same size as `Origin`, centered on both axes
    Centered,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Origin => "origin",
            FitMode::Centered => "centered",
        }
    }
}

/// Result of fitting one page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitPlan {
    /// Turn the raster 90° before drawing
    pub rotate: bool,
    /// Destination, relative to the drawable area
    pub target: DrawableRect,
}

/// Plan a page with the default origin-anchored placement
#[must_use]
pub fn plan(image_width: u32, image_height: u32, drawable: DrawableRect) -> FitPlan {
    plan_with_mode(image_width, image_height, drawable, FitMode::Origin)
}

#[must_use]
pub fn plan_with_mode(
    image_width: u32,
    image_height: u32,
    drawable: DrawableRect,
    mode: FitMode,
) -> FitPlan {
    if image_width == 0 || image_height == 0 {
        return FitPlan {
            rotate: false,
            target: DrawableRect::default(),
        };
    }

    let rotate = needs_rotation(image_width, image_height, drawable);
    let (width, height) = if rotate {
        (image_height, image_width)
    } else {
        (image_width, image_height)
    };

    let (iw, ih) = (u64::from(width), u64::from(height));
    let (dw, dh) = (u64::from(drawable.width), u64::from(drawable.height));

    // viewport_aspect > image_aspect  <=>  dh / dw > ih / iw
    let (target_width, target_height) = if dh * iw > ih * dw {
        (drawable.width, (dw * ih / iw) as u32)
    } else {
        ((iw * dh / ih) as u32, drawable.height)
    };

    let (x, y) = match mode {
        FitMode::Origin => (0, 0),
        FitMode::Centered => (
            (drawable.width - target_width) / 2,
            (drawable.height - target_height) / 2,
        ),
    };

    FitPlan {
        rotate,
        target: DrawableRect::new(x, y, target_width, target_height),
    }
}

/// Portrait sheet with a landscape page, or the other way round.
///
/// Square pages or square drawable areas never rotate.
fn needs_rotation(image_width: u32, image_height: u32, drawable: DrawableRect) -> bool {
    let viewport_landscape = drawable.height < drawable.width;
    let viewport_portrait = drawable.height > drawable.width;
    let image_landscape = image_height < image_width;
    let image_portrait = image_height > image_width;

    (viewport_landscape && image_portrait) || (viewport_portrait && image_landscape)
}
