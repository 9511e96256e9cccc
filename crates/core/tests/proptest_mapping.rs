//! Property-based tests for coordinate mapping and view state
//!
//! Verifies the mapper's forward/inverse pair, zoom clamping and rectangle
//! normalization across generated inputs.

use blueprint_core::{
    CoordinateMapper, NormalizedPoint, NormalizedRect, PageDimensions, ScreenPoint, ViewState,
    ZoomPanController, MAX_ZOOM, MIN_ZOOM,
};
use proptest::prelude::*;

fn unit() -> impl Strategy<Value = f32> {
    prop_oneof![0.0f32..=1.0, Just(0.0), Just(1.0)]
}

prop_compose! {
    fn normalized_point()(x in unit(), y in unit()) -> NormalizedPoint {
        NormalizedPoint::new(x, y)
    }
}

prop_compose! {
    fn view_state()(
        zoom in MIN_ZOOM..=MAX_ZOOM,
        pan_x in -2000.0f32..2000.0,
        pan_y in -2000.0f32..2000.0,
        page in 1u32..50
    ) -> ViewState {
        ViewState { zoom, pan_x, pan_y, current_page: page }
    }
}

prop_compose! {
    fn page_dimensions()(width in 200.0f32..2000.0, height in 200.0f32..2000.0) -> PageDimensions {
        PageDimensions::new(width, height)
    }
}

#[derive(Debug, Clone)]
enum ZoomOp {
    In,
    Out,
    To(f32),
    At(f32),
}

fn zoom_op() -> impl Strategy<Value = ZoomOp> {
    prop_oneof![
        Just(ZoomOp::In),
        Just(ZoomOp::Out),
        (-10.0f32..10.0).prop_map(ZoomOp::To),
        (-3.0f32..3.0).prop_map(ZoomOp::At),
    ]
}

proptest! {
    #[test]
    fn test_to_normalized_inverts_project(
        point in normalized_point(),
        view in view_state(),
        page in page_dimensions()
    ) {
        let mapper = CoordinateMapper::new(&view, page);
        let screen = mapper.project(point);
        let back = mapper.to_normalized(screen).inside();

        prop_assert!(back.is_some(), "in-range point mapped out of bounds: {:?}", point);
        let back = back.unwrap();
        prop_assert!((back.x - point.x).abs() < 1e-3);
        prop_assert!((back.y - point.y).abs() < 1e-3);
    }

    #[test]
    fn test_zoom_stays_within_bounds(ops in prop::collection::vec(zoom_op(), 1..60)) {
        let mut view = ZoomPanController::default();
        for op in ops {
            match op {
                ZoomOp::In => view.zoom_in(),
                ZoomOp::Out => view.zoom_out(),
                ZoomOp::To(z) => view.zoom_to(z),
                ZoomOp::At(d) => view.zoom_at(d, ScreenPoint::new(320.0, 240.0)),
            }
            prop_assert!(view.zoom() >= MIN_ZOOM);
            prop_assert!(view.zoom() <= MAX_ZOOM);
        }
    }

    #[test]
    fn test_zoom_at_keeps_pivot_content_fixed(
        view in view_state(),
        page in page_dimensions(),
        delta in -2.0f32..2.0,
        px in 0.0f32..1200.0,
        py in 0.0f32..900.0
    ) {
        let mut controller = ZoomPanController::default();
        controller.set_page(view.current_page);
        controller.zoom_to(view.zoom);
        controller.pan_by(view.pan_x, view.pan_y);

        let pivot = ScreenPoint::new(px, py);
        let under_cursor = CoordinateMapper::new(controller.state(), page).unproject(pivot);
        controller.zoom_at(delta, pivot);
        let after = CoordinateMapper::new(controller.state(), page).project(under_cursor);

        prop_assert!((after.x - pivot.x).abs() < 0.05);
        prop_assert!((after.y - pivot.y).abs() < 0.05);
    }

    #[test]
    fn test_rect_from_corners_is_order_independent(a in normalized_point(), b in normalized_point()) {
        let forward = NormalizedRect::from_corners(a, b);
        let backward = NormalizedRect::from_corners(b, a);

        prop_assert_eq!(forward, backward);
        prop_assert!(forward.width >= 0.0 && forward.height >= 0.0);
        prop_assert!(forward.right() <= 1.0 + 1e-6);
        prop_assert!(forward.bottom() <= 1.0 + 1e-6);
    }
}
