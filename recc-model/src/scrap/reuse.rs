use ndarray::{s, Array1, Array2, Array3, Array4, ArrayView3};
use recc_core::utils::guarded_divide;

/// Product re-use of one sector in one year.
#[derive(Debug, Clone, PartialEq)]
pub struct ReuseOutcome {
    /// End-of-life material going to re-use, `[q, k, m, e]`
    pub reused: Array4<f64>,
    /// End-of-life material going to waste management, `[q, k, m, e]`
    pub to_waste: Array4<f64>,
    /// Re-used material entering final consumption, `[q, k, m, e]`
    pub to_consumption: Array4<f64>,
    /// Re-use candidate mass that exceeded the sector's consumption or found no
    /// consumption slot, `[m]`. It stays in `to_waste`.
    pub dropped: Array1<f64>,
}

/// Split end-of-life material into re-use and waste management and place the re-used mass
/// into final consumption.
///
/// * `outflow` element-resolved end-of-life material, `[q, k, m, e]`
/// * `rate` share of outflow offered for re-use, `[m, q, k]`
/// * `consumption` material mass of final consumption, `[q, k, m]`
///
/// The re-use candidate of a material is capped by its consumption. The capped mass is taken
/// from every outflow slot with the same ratio and placed into consumption slots in proportion
/// to their share of the material's consumption.
///
/// Placement stays inside the sector: the shares are taken over this sector's consumption
/// only, so re-used vehicle parts never enter buildings and vice versa.
pub fn reuse_sector(
    outflow: &Array4<f64>,
    rate: ArrayView3<f64>,
    consumption: &Array3<f64>,
) -> ReuseOutcome {
    let (n_regions, n_goods, n_materials, n_elements) = outflow.dim();
    let mut reused = Array4::<f64>::zeros(outflow.raw_dim());
    let mut to_consumption = Array4::<f64>::zeros(outflow.raw_dim());
    let mut dropped = Array1::<f64>::zeros(n_materials);

    for m in 0..n_materials {
        let outflow_total = outflow.slice(s![.., .., m, 0]).sum();
        let consumption_total = consumption.slice(s![.., .., m]).sum();
        let candidate = (0..n_regions)
            .flat_map(|q| (0..n_goods).map(move |k| (q, k)))
            .map(|(q, k)| rate[[m, q, k]] * outflow[[q, k, m, 0]])
            .sum::<f64>();
        let candidate = candidate.max(0.0);
        let potential = candidate.min(consumption_total).max(0.0);
        let ratio = guarded_divide(potential, outflow_total);
        if ratio == 0.0 {
            dropped[m] = candidate;
            continue;
        }

        let mut by_element = Array1::<f64>::zeros(n_elements);
        for q in 0..n_regions {
            for k in 0..n_goods {
                let mut slot = reused.slice_mut(s![q, k, m, ..]);
                slot.assign(&outflow.slice(s![q, k, m, ..]));
                slot.mapv_inplace(|v| v * ratio);
                by_element += &slot;
            }
        }

        let mut placed = 0.0;
        for q in 0..n_regions {
            for k in 0..n_goods {
                let share = guarded_divide(consumption[[q, k, m]], consumption_total);
                to_consumption
                    .slice_mut(s![q, k, m, ..])
                    .assign(&by_element.mapv(|v| v * share));
                placed += share * by_element[0];
            }
        }
        dropped[m] = candidate - placed;
    }

    let to_waste = outflow - &reused;
    ReuseOutcome {
        reused,
        to_waste,
        to_consumption,
        dropped,
    }
}

/// Material mass of a `[q, k, m, e]` table summed over its slots, `[m, e]`.
pub fn material_totals(values: &Array4<f64>) -> Array2<f64> {
    let (_, _, n_materials, n_elements) = values.dim();
    Array2::from_shape_fn((n_materials, n_elements), |(m, e)| {
        values.slice(s![.., .., m, e]).sum()
    })
}
