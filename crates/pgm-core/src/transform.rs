//! Pointer ↔ model coordinate mapping under pan and zoom.
//!
//! The rendering engine draws a model point `m` at `m * zoom + pan` inside
//! its container. Pointer events arrive in client (page) coordinates, so the
//! container origin has to be taken off first.

use crate::model::Position;

/// Map a client-space pointer position to model space.
///
/// `model = (pointer - container_origin - pan) / zoom`, per axis. `zoom` must
/// be positive; the rendering engine never reports anything else.
pub fn to_model_coordinates(
    pointer: Position,
    container_origin: Position,
    pan: Position,
    zoom: f64,
) -> Position {
    Position {
        x: (pointer.x - container_origin.x - pan.x) / zoom,
        y: (pointer.y - container_origin.y - pan.y) / zoom,
    }
}

/// Forward transform: where a model point lands in client space.
pub fn to_rendered_coordinates(
    model: Position,
    container_origin: Position,
    pan: Position,
    zoom: f64,
) -> Position {
    Position {
        x: model.x * zoom + pan.x + container_origin.x,
        y: model.y * zoom + pan.y + container_origin.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identity_at_rest() {
        let p = Position::new(120.0, 80.0);
        let m = to_model_coordinates(p, Position::ORIGIN, Position::ORIGIN, 1.0);
        assert_eq!(m, p);
    }

    #[test]
    fn removes_origin_and_pan_then_scales() {
        let m = to_model_coordinates(
            Position::new(310.0, 220.0),
            Position::new(10.0, 20.0),
            Position::new(100.0, 0.0),
            2.0,
        );
        assert_eq!(m, Position::new(100.0, 100.0));
    }

    proptest! {
        #[test]
        fn inverts_forward_transform(
            mx in -5000.0f64..5000.0,
            my in -5000.0f64..5000.0,
            px in -2000.0f64..2000.0,
            py in -2000.0f64..2000.0,
            ox in 0.0f64..1000.0,
            oy in 0.0f64..1000.0,
            zoom in 0.1f64..2.0,
        ) {
            let model = Position::new(mx, my);
            let origin = Position::new(ox, oy);
            let pan = Position::new(px, py);

            let rendered = to_rendered_coordinates(model, origin, pan, zoom);
            let back = to_model_coordinates(rendered, origin, pan, zoom);

            // Relative tolerance scaled by the magnitudes involved.
            let tol = 1e-9 * (1.0 + mx.abs().max(my.abs()) + (px.abs() + ox).max(py.abs() + oy) / zoom);
            prop_assert!((back.x - mx).abs() <= tol, "x: {} vs {}", back.x, mx);
            prop_assert!((back.y - my).abs() <= tol, "y: {} vs {}", back.y, my);
        }
    }
}
