// ---------- standard normal quantile (no external dep) ----------

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.2e-9).
///
/// Returns `-inf` / `+inf` at `p = 0` / `p = 1` and NaN outside `[0, 1]`.
pub fn norm_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > P_HIGH {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_ppf_known_values() {
        assert!(norm_ppf(0.5).abs() < 1e-12);
        assert!((norm_ppf(0.975) - 1.959_963_984_540_054).abs() < 1e-8);
        assert!((norm_ppf(0.841_344_746_068_542_9) - 1.0).abs() < 1e-8);
        assert!((norm_ppf(0.001) + 3.090_232_306_167_813).abs() < 1e-8);
        assert!((norm_ppf(1e-7) + 5.199_337_582_192_817).abs() < 1e-7);
    }

    #[test]
    fn norm_ppf_symmetry() {
        for p in [1e-6, 0.01, 0.02, 0.1, 0.3, 0.45] {
            assert!((norm_ppf(p) + norm_ppf(1.0 - p)).abs() < 1e-8, "p = {p}");
        }
    }

    #[test]
    fn norm_ppf_monotone() {
        let mut prev = f64::NEG_INFINITY;
        for i in 1..1000 {
            let z = norm_ppf(i as f64 / 1000.0);
            assert!(z > prev);
            prev = z;
        }
    }

    #[test]
    fn norm_ppf_boundaries() {
        assert_eq!(norm_ppf(0.0), f64::NEG_INFINITY);
        assert_eq!(norm_ppf(1.0), f64::INFINITY);
        assert!(norm_ppf(-0.1).is_nan());
        assert!(norm_ppf(1.1).is_nan());
    }
}
