//! Two-state drop-rate Kalman filter (spec §4.B): constant-acceleration
//! model over (drop_rate_dps, drop_accel_dps2).

use crate::util::floor_denominator;

type Vec2 = [f32; 2];
type Mat2 = [[f32; 2]; 2];

fn mat2_mul(a: &Mat2, b: &Mat2) -> Mat2 {
    let mut out = [[0.0; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            out[i][j] = (0..2).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn mat2_transpose(a: &Mat2) -> Mat2 {
    [[a[0][0], a[1][0]], [a[0][1], a[1][1]]]
}

fn mat2_add(a: &Mat2, b: &Mat2) -> Mat2 {
    [
        [a[0][0] + b[0][0], a[0][1] + b[0][1]],
        [a[1][0] + b[1][0], a[1][1] + b[1][1]],
    ]
}

fn mat2_vec2(a: &Mat2, v: &Vec2) -> Vec2 {
    [a[0][0] * v[0] + a[0][1] * v[1], a[1][0] * v[0] + a[1][1] * v[1]]
}

/// `F(dt) = [[1,dt],[0,1]]` (spec §4.B).
fn f_matrix(dt: f32) -> Mat2 {
    [[1.0, dt], [0.0, 1.0]]
}

fn q_matrix(dt: f32, sigma_a: f32) -> Mat2 {
    let sa2 = sigma_a * sigma_a;
    [
        [sa2 * dt * dt * dt / 3.0, sa2 * dt * dt / 2.0],
        [sa2 * dt * dt / 2.0, sa2 * dt],
    ]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DripKf {
    x: Vec2,
    p: Mat2,
    sigma_a: f32,
    r: f32,
}

impl DripKf {
    pub fn new(sigma_a: f32, r: f32) -> Self {
        Self {
            x: [0.0, 0.0],
            p: [[10.0, 0.0], [0.0, 1.0]],
            sigma_a,
            r,
        }
    }

    pub fn init(&mut self, drop_rate_dps: f32, drop_accel_dps2: f32) {
        self.x = [drop_rate_dps, drop_accel_dps2];
        self.p = [[1.0, 0.0], [0.0, 0.1]];
    }

    /// Predict-only time update, used on ticks with no fresh rate
    /// measurement (spec §4.G step 6 leaves the model silent on this case;
    /// a predict-only step is the natural reading of "update the filter"
    /// without a measurement this tick).
    pub fn predict_only(&mut self, dt_s: f32) {
        if dt_s <= 1e-6 {
            return;
        }
        let f = f_matrix(dt_s);
        let q = q_matrix(dt_s, self.sigma_a);
        self.x = mat2_vec2(&f, &self.x);
        self.p = mat2_add(&mat2_mul(&mat2_mul(&f, &self.p), &mat2_transpose(&f)), &q);
    }

    /// Full predict + update given a measured drop rate this tick.
    pub fn update(&mut self, measured_rate_dps: f32, dt_s: f32) -> f32 {
        if dt_s <= 1e-6 {
            return self.x[0].max(0.0);
        }
        let f = f_matrix(dt_s);
        let q = q_matrix(dt_s, self.sigma_a);
        self.x = mat2_vec2(&f, &self.x);
        self.p = mat2_add(&mat2_mul(&mat2_mul(&f, &self.p), &mat2_transpose(&f)), &q);

        let y = measured_rate_dps - self.x[0];
        let s = floor_denominator(self.p[0][0] + self.r);
        let k = [self.p[0][0] / s, self.p[1][0] / s];
        self.x[0] += k[0] * y;
        self.x[1] += k[1] * y;
        let kh = [[k[0], 0.0], [k[1], 0.0]];
        let i2 = [[1.0, 0.0], [0.0, 1.0]];
        let i_minus_kh = [
            [i2[0][0] - kh[0][0], i2[0][1] - kh[0][1]],
            [i2[1][0] - kh[1][0], i2[1][1] - kh[1][1]],
        ];
        self.p = mat2_mul(&i_minus_kh, &self.p);

        self.x[0] = self.x[0].max(0.0);
        self.x[0]
    }

    pub fn drop_rate_dps(&self) -> f32 {
        self.x[0].max(0.0)
    }

    /// `flow_drip_gps = drop_rate_dps * wpd_gpd` (spec §4.B).
    pub fn flow_gps(&self, wpd_gpd: f32) -> f32 {
        self.drop_rate_dps() * wpd_gpd
    }

    pub fn set_r(&mut self, r: f32) {
        self.r = r;
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn covariance_is_valid(&self, tol: f32) -> bool {
        (self.p[0][1] - self.p[1][0]).abs() <= tol && self.p[0][0] >= -tol && self.p[1][1] >= -tol
    }
}
