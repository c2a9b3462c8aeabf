use nalgebra::DVector;

/// Adaptive Dormand-Prince 4(5) integrator.
///
/// Steps adaptively between consecutive output samples and records the state
/// at every sample. The derivative is never evaluated outside the span of the
/// sample sequence: internal steps are clamped to the current segment.
#[derive(Debug, Clone, Copy)]
pub struct Rk45 {
    /// Relative tolerance on the per-step error estimate
    pub rtol: f64,
    /// Absolute tolerance on the per-step error estimate
    pub atol: f64,
}

impl Default for Rk45 {
    fn default() -> Rk45 {
        Rk45 {
            rtol: 1e-8,
            atol: 1e-10,
        }
    }
}

// Dormand-Prince tableau
const A2: f64 = 1.0 / 5.0;
const A3: f64 = 3.0 / 10.0;
const A4: f64 = 4.0 / 5.0;
const A5: f64 = 8.0 / 9.0;

const B21: f64 = 1.0 / 5.0;
const B31: f64 = 3.0 / 40.0;
const B32: f64 = 9.0 / 40.0;
const B41: f64 = 44.0 / 45.0;
const B42: f64 = -56.0 / 15.0;
const B43: f64 = 32.0 / 9.0;
const B51: f64 = 19372.0 / 6561.0;
const B52: f64 = -25360.0 / 2187.0;
const B53: f64 = 64448.0 / 6561.0;
const B54: f64 = -212.0 / 729.0;
const B61: f64 = 9017.0 / 3168.0;
const B62: f64 = -355.0 / 33.0;
const B63: f64 = 46732.0 / 5247.0;
const B64: f64 = 49.0 / 176.0;
const B65: f64 = -5103.0 / 18656.0;

// 5th order weights
const C1: f64 = 35.0 / 384.0;
const C3: f64 = 500.0 / 1113.0;
const C4: f64 = 125.0 / 192.0;
const C5: f64 = -2187.0 / 6784.0;
const C6: f64 = 11.0 / 84.0;

// 4th order weights, for the error estimate
const D1: f64 = 5179.0 / 57600.0;
const D3: f64 = 7571.0 / 16695.0;
const D4: f64 = 393.0 / 640.0;
const D5: f64 = -92097.0 / 339200.0;
const D6: f64 = 187.0 / 2100.0;
const D7: f64 = 1.0 / 40.0;

impl Rk45 {
    pub fn new(rtol: f64, atol: f64) -> Rk45 {
        Rk45 { rtol, atol }
    }

    /// Integrate `dy/dt = f(t, y)` from `y(times[0]) = y0`, returning the
    /// state at every entry of `times`. `times` must be ascending.
    pub fn solve<F>(&self, mut f: F, times: &[f64], y0: &DVector<f64>) -> Vec<DVector<f64>>
    where
        F: FnMut(f64, &DVector<f64>) -> DVector<f64>,
    {
        debug_assert!(times.windows(2).all(|w| w[0] <= w[1]));

        let mut out = Vec::with_capacity(times.len());
        out.push(y0.clone());
        let mut y = y0.clone();

        for seg in times.windows(2) {
            let (t0, t1) = (seg[0], seg[1]);
            if t1 > t0 {
                y = self.integrate_segment(&mut f, t0, t1, y);
            }
            out.push(y.clone());
        }
        out
    }

    /// One adaptively stepped sweep over `[t0, t1]`.
    fn integrate_segment<F>(&self, f: &mut F, t0: f64, t1: f64, mut y: DVector<f64>) -> DVector<f64>
    where
        F: FnMut(f64, &DVector<f64>) -> DVector<f64>,
    {
        let span = t1 - t0;
        let dt_min = span * 1e-12;
        let mut t = t0;
        let mut dt = span;

        while t < t1 - dt_min {
            if t + dt > t1 {
                dt = t1 - t;
            }

            let k1 = f(t, &y);
            let y2 = &y + &k1 * (dt * B21);
            let k2 = f(t + A2 * dt, &y2);
            let y3 = &y + &k1 * (dt * B31) + &k2 * (dt * B32);
            let k3 = f(t + A3 * dt, &y3);
            let y4 = &y + &k1 * (dt * B41) + &k2 * (dt * B42) + &k3 * (dt * B43);
            let k4 = f(t + A4 * dt, &y4);
            let y5 = &y + &k1 * (dt * B51) + &k2 * (dt * B52) + &k3 * (dt * B53) + &k4 * (dt * B54);
            let k5 = f(t + A5 * dt, &y5);
            let y6 = &y
                + &k1 * (dt * B61)
                + &k2 * (dt * B62)
                + &k3 * (dt * B63)
                + &k4 * (dt * B64)
                + &k5 * (dt * B65);
            let k6 = f(t + dt, &y6);

            // 5th order solution
            let y_next =
                &y + &k1 * (dt * C1) + &k3 * (dt * C3) + &k4 * (dt * C4) + &k5 * (dt * C5)
                    + &k6 * (dt * C6);
            // FSAL stage, only needed for the embedded 4th order estimate
            let k7 = f(t + dt, &y_next);
            let y_low = &y
                + &k1 * (dt * D1)
                + &k3 * (dt * D3)
                + &k4 * (dt * D4)
                + &k5 * (dt * D5)
                + &k6 * (dt * D6)
                + &k7 * (dt * D7);

            let err = self.scaled_error(&y, &y_next, &y_low);

            if err <= 1.0 || dt <= dt_min {
                t += dt;
                y = y_next;
                if err > 0.0 {
                    dt *= (0.9 * (1.0 / err).powf(0.2)).min(5.0);
                } else {
                    dt *= 5.0;
                }
            } else {
                dt *= (0.9 * (1.0 / err).powf(0.25)).max(0.1);
            }
        }
        y
    }

    /// RMS of the componentwise error scaled by `atol + rtol * |y|`.
    fn scaled_error(&self, y: &DVector<f64>, high: &DVector<f64>, low: &DVector<f64>) -> f64 {
        let n = y.len();
        if n == 0 {
            return 0.0;
        }
        let sum: f64 = (0..n)
            .map(|i| {
                let sc = self.atol + self.rtol * high[i].abs().max(y[i].abs());
                ((high[i] - low[i]) / sc).powi(2)
            })
            .sum();
        (sum / n as f64).sqrt()
    }
}
