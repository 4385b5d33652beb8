use super::*;

const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

#[test]
fn new_buffer_is_background_at_far_depth() {
    let img = ImageBuffer::new(3, 2, BLACK);
    img.validate().unwrap();
    assert_eq!(img.pixel_count(), 6);
    assert!(img.depth.iter().all(|&d| d == FAR_DEPTH));
    assert_eq!(img.pixel(2, 1), Some(([0, 0, 0, 255], 1.0)));
    assert_eq!(img.pixel(3, 0), None);
}

#[test]
fn clear_reuses_allocation() {
    let mut img = ImageBuffer::new(4, 4, BLACK);
    img.set_pixel(1, 1, [9, 9, 9, 9], 0.2);
    let color_ptr = img.color.as_ptr();
    img.clear(Rgba::new(1.0, 0.0, 0.0, 1.0));
    assert_eq!(img.color.as_ptr(), color_ptr);
    assert_eq!(img.pixel(1, 1), Some(([255, 0, 0, 255], 1.0)));
}

#[test]
fn depth_tested_write_keeps_nearer_pixel() {
    let mut img = ImageBuffer::new(1, 1, BLACK);
    img.set_pixel_depth_tested(0, 0, [1, 1, 1, 255], 0.5);
    img.set_pixel_depth_tested(0, 0, [2, 2, 2, 255], 0.7);
    img.set_pixel_depth_tested(0, 0, [3, 3, 3, 255], 0.5);
    assert_eq!(img.pixel(0, 0), Some(([1, 1, 1, 255], 0.5)));
}

#[test]
fn flip_rows_reverses_vertical_order() {
    let mut img = ImageBuffer::new(2, 3, BLACK);
    for y in 0..3 {
        for x in 0..2 {
            img.set_pixel(x, y, [y as u8, x as u8, 0, 255], y as f32 / 10.0);
        }
    }
    let original = img.clone();
    img.flip_rows();
    for y in 0..3 {
        for x in 0..2 {
            assert_eq!(img.pixel(x, y), original.pixel(x, 2 - y));
        }
    }
    img.normalize_row_order(RowOrder::TopDown);
    img.normalize_row_order(RowOrder::BottomUp);
    assert_eq!(img, original);
}

#[test]
fn sanitize_resets_non_finite_and_clamps() {
    let bg = Rgba::new(0.0, 0.0, 1.0, 1.0);
    let mut img = ImageBuffer::new(4, 1, BLACK);
    img.set_pixel(0, 0, [255, 0, 0, 255], f32::NAN);
    img.set_pixel(1, 0, [255, 0, 0, 255], f32::INFINITY);
    img.set_pixel(2, 0, [255, 0, 0, 255], -0.5);
    img.set_pixel(3, 0, [255, 0, 0, 255], 0.25);

    assert_eq!(img.sanitize(bg), 2);
    assert_eq!(img.pixel(0, 0), Some(([0, 0, 255, 255], 1.0)));
    assert_eq!(img.pixel(1, 0), Some(([0, 0, 255, 255], 1.0)));
    assert_eq!(img.pixel(2, 0), Some(([255, 0, 0, 255], 0.0)));
    assert_eq!(img.pixel(3, 0), Some(([255, 0, 0, 255], 0.25)));
}

#[test]
fn blit_places_tile_and_rejects_overflow() {
    let mut dst = ImageBuffer::new(4, 4, BLACK);
    let mut src = ImageBuffer::new(2, 2, Rgba::new(1.0, 1.0, 1.0, 1.0));
    src.depth.fill(0.5);
    let tile = ViewportTile {
        x: 2,
        y: 2,
        width: 2,
        height: 2,
    };
    dst.blit(tile, &src).unwrap();
    assert_eq!(dst.pixel(3, 3), Some(([255, 255, 255, 255], 0.5)));
    assert_eq!(dst.pixel(1, 1), Some(([0, 0, 0, 255], 1.0)));

    let bad = ViewportTile {
        x: 3,
        y: 0,
        width: 2,
        height: 2,
    };
    assert!(dst.blit(bad, &src).is_err());
}

#[test]
fn fingerprint_tracks_color_and_depth() {
    let a = ImageBuffer::new(2, 2, BLACK);
    let mut b = a.clone();
    assert_eq!(a.fingerprint(), b.fingerprint());
    b.depth[3] = 0.5;
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn rgba_image_matches_color_plane() {
    let img = ImageBuffer::new(2, 1, Rgba::new(0.0, 1.0, 0.0, 1.0));
    let out = img.to_rgba_image().unwrap();
    assert_eq!(out.get_pixel(1, 0).0, [0, 255, 0, 255]);
}

#[test]
fn copy_from_reuses_allocation_and_checks_shape() {
    let mut src = ImageBuffer::new(3, 2, Rgba::light_gray());
    src.set_pixel(2, 1, [5, 6, 7, 255], 0.3);
    let mut dst = ImageBuffer::new(3, 2, Rgba::new(0.0, 0.0, 0.0, 1.0));
    let color_ptr = dst.color.as_ptr();
    dst.copy_from(&src).unwrap();
    assert_eq!(dst, src);
    assert_eq!(dst.color.as_ptr(), color_ptr);

    let mut wrong = ImageBuffer::new(2, 3, Rgba::light_gray());
    assert!(wrong.copy_from(&src).is_err());
}
