// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::model::*;
    use crate::ports::PlanarImage;

    #[test]
    fn test_yuv420p_geometry_rounds_chroma_up() {
        let geometry = FrameGeometry::yuv420p(5, 3);
        assert_eq!(geometry.planes.len(), 3);
        assert_eq!(geometry.planes[0], PlaneGeometry { row_bytes: 5, rows: 3 });
        assert_eq!(geometry.planes[1], PlaneGeometry { row_bytes: 3, rows: 2 });
        assert_eq!(geometry.planes[2], geometry.planes[1]);
    }

    #[test]
    fn test_plane_stride_is_aligned() {
        let plane = Plane::new(PlaneGeometry { row_bytes: 33, rows: 2 }, 32);
        assert_eq!(plane.stride(), 64);
        assert_eq!(plane.data().len(), 128);
    }

    #[test]
    fn test_plane_fill_leaves_padding_untouched() {
        let mut plane = Plane::new(PlaneGeometry { row_bytes: 4, rows: 2 }, 8);
        plane.fill(9);
        assert_eq!(&plane.data()[0..8], &[9, 9, 9, 9, 0, 0, 0, 0]);
        assert_eq!(&plane.data()[8..16], &[9, 9, 9, 9, 0, 0, 0, 0]);
    }

    #[test]
    fn test_solid_frame_luma_and_chroma() {
        let frame = Frame::solid_yuv420p(8, 4, 200);
        assert_eq!(frame.luma_at(0, 0), 200);
        assert_eq!(frame.luma_at(7, 3), 200);
        assert_eq!(frame.planes()[1].data()[0], 128);
    }

    #[test]
    fn test_copy_of_is_a_deep_copy() {
        let mut original = Frame::solid_yuv420p(8, 4, 50);
        original.set_pts(Some(42));
        let copy = Frame::copy_of(&original);
        original.fill_luma(10);

        assert_eq!(copy.pts(), Some(42));
        assert_eq!(copy.luma_at(3, 2), 50);
        assert!(!copy.same_pixels(&original));
    }

    #[test]
    fn test_copy_pixels_between_different_strides() {
        let mut source = Frame::solid_yuv420p(6, 2, 0);
        source.set_luma(5, 1, 77);

        let mut target = Frame::with_alignment(source.geometry().clone(), 1);
        assert_eq!(target.planes()[0].stride(), 6);
        copy_pixels(&source, &mut target);
        assert_eq!(target.luma_at(5, 1), 77);
        assert!(target.same_pixels(&source));
    }

    #[test]
    fn test_same_pixels_rejects_other_geometry() {
        let a = Frame::solid_yuv420p(8, 4, 0);
        let b = Frame::solid_yuv420p(8, 6, 0);
        assert!(!a.same_pixels(&b));
    }

    #[test]
    fn test_luma_plane_view() {
        let frame = Frame::solid_yuv420p(10, 3, 16);
        let luma = frame.luma().unwrap();
        assert_eq!(luma.width(), 10);
        assert_eq!(luma.height(), 3);
        assert_eq!(luma.sample_count(), 30);
        let rows: Vec<&[u8]> = luma.rows().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.len() == 10 && row.iter().all(|&v| v == 16)));
    }

    #[test]
    fn test_luma_plane_rejects_short_buffer() {
        let data = [0u8; 10];
        assert!(LumaPlane::new(&data, 4, 3, 4).is_none());
        assert!(LumaPlane::new(&data, 4, 2, 6).is_some());
        assert!(LumaPlane::new(&data, 8, 1, 4).is_none());
    }

    #[test]
    fn test_luma_plane_last_row_may_omit_padding() {
        let data = [1u8; 14];
        let luma = LumaPlane::new(&data, 4, 2, 10).unwrap();
        assert_eq!(luma.rows().count(), 2);
    }
}
