// Ports - How the classifier and substitution policy see a frame

use crate::domain::model::{FrameGeometry, LumaPlane};

/// Read access to a planar picture.
///
/// Implemented for the crate's owned [`Frame`](crate::domain::model::Frame) and for
/// decoded libav frames, so the black frame logic never depends on where pixels live.
pub trait PlanarImage {
    /// Dimensions and per-plane byte layout
    fn geometry(&self) -> FrameGeometry;

    /// Raw bytes of a plane including stride padding
    fn plane_data(&self, index: usize) -> &[u8];

    /// Distance in bytes between the starts of two rows
    fn plane_stride(&self, index: usize) -> usize;

    /// Presentation timestamp
    fn pts(&self) -> Option<i64>;

    /// The primary (Y) plane; `None` if the buffer is too small for the declared size
    fn luma(&self) -> Option<LumaPlane<'_>> {
        let geometry = self.geometry();
        LumaPlane::new(
            self.plane_data(0),
            geometry.width as usize,
            geometry.height as usize,
            self.plane_stride(0),
        )
    }
}

/// Write access to a planar picture's pixels
pub trait PlanarImageMut: PlanarImage {
    fn plane_data_mut(&mut self, index: usize) -> &mut [u8];
}
