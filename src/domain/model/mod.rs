// Domain models - Frame buffers and the views the classifier reads

use crate::ports::{PlanarImage, PlanarImageMut};

/// Byte layout of a single image plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneGeometry {
    /// Meaningful bytes per row (excludes stride padding)
    pub row_bytes: usize,
    /// Number of rows
    pub rows: usize,
}

/// Dimensions and plane layout of a frame; equal geometries can be copied into each other
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub planes: Vec<PlaneGeometry>,
}

impl FrameGeometry {
    /// Planar 8-bit 4:2:0 layout (YUV420P), the layout the encoder consumes
    pub fn yuv420p(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        let chroma = PlaneGeometry {
            row_bytes: w.div_ceil(2),
            rows: h.div_ceil(2),
        };
        Self {
            width,
            height,
            planes: vec![PlaneGeometry { row_bytes: w, rows: h }, chroma, chroma],
        }
    }
}

/// Owned plane buffer with stride (linesize) metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    stride: usize,
    geometry: PlaneGeometry,
}

impl Plane {
    /// Allocate a zeroed plane; the stride is rounded up to `align` bytes
    pub fn new(geometry: PlaneGeometry, align: usize) -> Self {
        let align = align.max(1);
        let stride = geometry.row_bytes.div_ceil(align) * align;
        Self {
            data: vec![0; stride * geometry.rows],
            stride,
            geometry,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn geometry(&self) -> PlaneGeometry {
        self.geometry
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Set every meaningful byte of the plane to `value`
    pub fn fill(&mut self, value: u8) {
        let PlaneGeometry { row_bytes, rows } = self.geometry;
        if self.stride == 0 {
            return;
        }
        for row in self.data.chunks_mut(self.stride).take(rows) {
            row[..row_bytes].fill(value);
        }
    }
}

/// Default row alignment for owned frames, matching libav's allocation alignment
pub const FRAME_ALIGN: usize = 32;

/// A decoded picture exclusively owned by whoever holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: FrameGeometry,
    planes: Vec<Plane>,
    pts: Option<i64>,
}

impl Frame {
    /// Allocate a zeroed frame with the given layout
    pub fn new(geometry: FrameGeometry) -> Self {
        Self::with_alignment(geometry, FRAME_ALIGN)
    }

    /// Allocate a zeroed frame whose plane strides are multiples of `align`
    pub fn with_alignment(geometry: FrameGeometry, align: usize) -> Self {
        let planes = geometry
            .planes
            .iter()
            .map(|plane| Plane::new(*plane, align))
            .collect();
        Self {
            geometry,
            planes,
            pts: None,
        }
    }

    /// YUV420P frame with uniform luma and neutral chroma
    pub fn solid_yuv420p(width: u32, height: u32, luma: u8) -> Self {
        let mut frame = Self::new(FrameGeometry::yuv420p(width, height));
        frame.planes[0].fill(luma);
        for plane in &mut frame.planes[1..] {
            plane.fill(128);
        }
        frame
    }

    /// Deep copy of any planar image, pixels and pts
    pub fn copy_of(image: &impl PlanarImage) -> Self {
        let mut frame = Self::new(image.geometry());
        frame.copy_from(image);
        frame
    }

    /// Overwrite pixels and pts from an image of the same geometry
    pub fn copy_from(&mut self, image: &impl PlanarImage) {
        copy_pixels(image, self);
        self.pts = image.pts();
    }

    pub fn geometry(&self) -> &FrameGeometry {
        &self.geometry
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    /// Set a single luma sample
    pub fn set_luma(&mut self, x: usize, y: usize, value: u8) {
        let stride = self.planes[0].stride;
        self.planes[0].data[y * stride + x] = value;
    }

    /// Luma sample at (x, y)
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        self.planes[0].data[y * self.planes[0].stride + x]
    }

    /// Fill the luma plane with a value
    pub fn fill_luma(&mut self, value: u8) {
        self.planes[0].fill(value);
    }

    /// True when every meaningful byte of every plane matches `other`, ignoring stride padding and pts
    pub fn same_pixels(&self, other: &impl PlanarImage) -> bool {
        if self.geometry != other.geometry() {
            return false;
        }
        self.planes.iter().enumerate().all(|(index, plane)| {
            let PlaneGeometry { row_bytes, rows } = plane.geometry;
            let theirs = other.plane_data(index);
            let their_stride = other.plane_stride(index);
            (0..rows).all(|row| {
                let ours = &plane.data[row * plane.stride..row * plane.stride + row_bytes];
                let start = row * their_stride;
                theirs.get(start..start + row_bytes) == Some(ours)
            })
        })
    }
}

impl PlanarImage for Frame {
    fn geometry(&self) -> FrameGeometry {
        self.geometry.clone()
    }

    fn plane_data(&self, index: usize) -> &[u8] {
        &self.planes[index].data
    }

    fn plane_stride(&self, index: usize) -> usize {
        self.planes[index].stride
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }
}

impl PlanarImageMut for Frame {
    fn plane_data_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.planes[index].data
    }
}

/// Copy the meaningful bytes of every plane row by row; strides may differ.
///
/// Callers guarantee equal geometry.
pub fn copy_pixels<S, T>(source: &S, target: &mut T)
where
    S: PlanarImage + ?Sized,
    T: PlanarImageMut + ?Sized,
{
    let geometry = target.geometry();
    for (index, plane) in geometry.planes.iter().enumerate() {
        let src_stride = source.plane_stride(index);
        let dst_stride = target.plane_stride(index);
        let src = source.plane_data(index);
        let dst = target.plane_data_mut(index);
        for row in 0..plane.rows {
            let from = &src[row * src_stride..row * src_stride + plane.row_bytes];
            dst[row * dst_stride..row * dst_stride + plane.row_bytes].copy_from_slice(from);
        }
    }
}

/// Borrowed view of an 8-bit luma plane
#[derive(Debug, Clone, Copy)]
pub struct LumaPlane<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> LumaPlane<'a> {
    /// Build a view; `None` when the buffer cannot hold `height` rows of `width` samples
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> Option<Self> {
        if stride < width {
            return None;
        }
        let needed = match height {
            0 => 0,
            h => (h - 1) * stride + width,
        };
        (data.len() >= needed).then_some(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples, width x height
    pub fn sample_count(&self) -> usize {
        self.width * self.height
    }

    /// Rows of samples without stride padding
    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let (width, height, stride, data) = (self.width, self.height, self.stride, self.data);
        (0..height).map(move |y| &data[y * stride..y * stride + width])
    }
}

#[cfg(test)]
mod tests;
