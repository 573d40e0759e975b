use std::fmt;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// Rectangle in pixels, anchored at `left`/`top`
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Returns a rectangle anchored at the top left corner
    ///
    /// # Example
    ///
    /// ```
    /// use vipp::Rect;
    /// let r = Rect::new(1280, 720);
    /// assert_eq!((r.left, r.top), (0, 0));
    /// ```
    pub const fn new(width: u32, height: u32) -> Self {
        Rect {
            left: 0,
            top: 0,
            width,
            height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@({},{})",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Selection target
///
/// Output endpoints write into memory and expose the compose targets, input endpoints read from
/// memory and expose the crop targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    /// active crop rectangle
    Crop,
    /// default crop rectangle, the full frame
    CropDefault,
    /// crop bounds, the full frame
    CropBounds,
    /// active compose rectangle
    Compose,
    /// default compose rectangle, the full frame
    ComposeDefault,
    /// compose bounds, the full frame
    ComposeBounds,
}

impl Target {
    /// Whether the target refers to the active rectangle rather than the frame
    pub fn is_active(self) -> bool {
        matches!(self, Target::Crop | Target::Compose)
    }

    pub fn is_compose(self) -> bool {
        matches!(
            self,
            Target::Compose | Target::ComposeDefault | Target::ComposeBounds
        )
    }
}
