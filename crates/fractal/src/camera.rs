use serde::{Deserialize, Serialize};

/// Free-flying camera for the 3D variant. Only the position is tracked; the
/// orientation is supplied on each move.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    position: [f32; 3],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [-0.5, 0.0, 2.5],
        }
    }
}

impl Camera {
    pub fn at(position: [f32; 3]) -> Self {
        Self { position }
    }

    pub fn position(&self) -> [f32; 3] {
        self.position
    }

    /// Moves `distance` units along the direction given by `yaw` and `pitch`
    /// (both in degrees) and returns the new position.
    ///
    /// `dx = d·cos(pitch)·sin(yaw)`, `dy = d·sin(pitch)`, `dz = d·cos(pitch)·cos(yaw)`.
    pub fn advance(&mut self, distance: f32, yaw_deg: f32, pitch_deg: f32) -> [f32; 3] {
        let (yaw_sin, yaw_cos) = yaw_deg.to_radians().sin_cos();
        let (pitch_sin, pitch_cos) = pitch_deg.to_radians().sin_cos();
        self.position[0] += distance * pitch_cos * yaw_sin;
        self.position[1] += distance * pitch_sin;
        self.position[2] += distance * pitch_cos * yaw_cos;
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn zero_angles_move_along_z() {
        let mut camera = Camera::at([0.0; 3]);
        assert!(approx(camera.advance(2.0, 0.0, 0.0), [0.0, 0.0, 2.0]));
    }

    #[test]
    fn yaw_quarter_turn_moves_along_x() {
        let mut camera = Camera::at([0.0; 3]);
        assert!(approx(camera.advance(1.5, 90.0, 0.0), [1.5, 0.0, 0.0]));
    }

    #[test]
    fn pitch_up_moves_along_y() {
        let mut camera = Camera::at([1.0, 1.0, 1.0]);
        assert!(approx(camera.advance(1.0, 37.0, 90.0), [1.0, 2.0, 1.0]));
    }

    #[test]
    fn moves_accumulate() {
        let mut camera = Camera::default();
        camera.advance(1.0, 0.0, 0.0);
        camera.advance(-1.0, 0.0, 0.0);
        assert!(approx(camera.position(), Camera::default().position()));
    }
}
