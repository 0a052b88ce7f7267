//! Screen capture model.
//!
//! The OS capture backend itself lives behind the [`ScreenSource`] trait;
//! this module owns the region model and the raw frame type the pipeline
//! hands to the OCR stage.

/// Errors that can occur while resolving a region or grabbing a frame.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid capture region {0:?}")]
    InvalidRegion(PixelRect),

    #[error("screen index {0} is out of bounds")]
    ScreenOutOfRange(usize),

    #[error("capture backend error: {0}")]
    Backend(String),
}

/// A rectangle in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// A raw captured image, tightly packed RGB8 rows.
///
/// `PartialEq` compares pixel data so the capturer can skip OCR when the
/// screen content did not change between two grabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(CaptureError::Backend(format!(
                "frame buffer size mismatch: got {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A single-color frame, mostly useful in tests.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// What part of the desktop the capturer grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSelection {
    /// A whole screen by index into [`ScreenSource::screens`].
    Screen(usize),
    /// A user-selected sub-rectangle.
    Rect(PixelRect),
}

impl RegionSelection {
    /// Resolve the selection against the available screens.
    pub fn resolve(&self, source: &dyn ScreenSource) -> Result<PixelRect, CaptureError> {
        match *self {
            RegionSelection::Screen(index) => source
                .screens()
                .get(index)
                .copied()
                .ok_or(CaptureError::ScreenOutOfRange(index)),
            RegionSelection::Rect(rect) => {
                if rect.width == 0 || rect.height == 0 {
                    return Err(CaptureError::InvalidRegion(rect));
                }
                Ok(rect)
            }
        }
    }
}

/// OS screen-grab backend, injected into the pipeline.
pub trait ScreenSource: Send {
    /// Bounds of every attached screen. Index 0 is the primary screen.
    fn screens(&self) -> Vec<PixelRect>;

    /// Grab the given rectangle.
    fn capture(&mut self, rect: PixelRect) -> Result<Frame, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneScreen;

    impl ScreenSource for OneScreen {
        fn screens(&self) -> Vec<PixelRect> {
            vec![PixelRect::new(0, 0, 1920, 1080)]
        }

        fn capture(&mut self, rect: PixelRect) -> Result<Frame, CaptureError> {
            Ok(Frame::solid(rect.width, rect.height, [0, 0, 0]))
        }
    }

    #[test]
    fn test_resolve_screen() {
        let rect = RegionSelection::Screen(0).resolve(&OneScreen).unwrap();
        assert_eq!(rect, PixelRect::new(0, 0, 1920, 1080));

        assert!(matches!(
            RegionSelection::Screen(3).resolve(&OneScreen),
            Err(CaptureError::ScreenOutOfRange(3))
        ));
    }

    #[test]
    fn test_resolve_rect() {
        let rect = PixelRect::new(10, 20, 300, 200);
        assert_eq!(RegionSelection::Rect(rect).resolve(&OneScreen).unwrap(), rect);

        let empty = PixelRect::new(10, 20, 0, 200);
        assert!(matches!(
            RegionSelection::Rect(empty).resolve(&OneScreen),
            Err(CaptureError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_frame_size_check() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(Frame::new(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn test_frame_equality() {
        let a = Frame::solid(4, 4, [1, 2, 3]);
        let b = Frame::solid(4, 4, [1, 2, 3]);
        let c = Frame::solid(4, 4, [1, 2, 4]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
