//! Material and element composition of products.
//!
//! Product quantities become material flows through the material intensity of their cohort,
//! and material flows become element flows through the element composition of the cohort.
//! Historic cohorts carry the exogenous composition of the existing stock. The composition of
//! a future cohort is only known once the scrap market of the year it enters the stock has
//! been balanced, so [`MaterialCompositionResolver`] fills it in year by year.

use crate::config::SpecialItems;
use crate::parameters::{Archetypes, ScenarioSector};
use ndarray::{s, Array, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis, Dimension};
use recc_core::classification::Classification;
use recc_core::time::TimeAxis;
use recc_core::utils::guarded_divide;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Material indices and cement share for splitting concrete into cement and aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcreteSplit {
    pub concrete: usize,
    pub cement: usize,
    pub aggregates: usize,
    pub cement_share: f64,
}

impl ConcreteSplit {
    /// `None` unless concrete, cement and aggregates are all in the material classification.
    pub fn resolve(
        materials: &Classification,
        items: &SpecialItems,
        cement_share: f64,
    ) -> Option<Self> {
        Some(Self {
            concrete: materials.position(&items.concrete)?,
            cement: materials.position(&items.cement)?,
            aggregates: materials.position(&items.aggregates)?,
            cement_share,
        })
    }

    /// Move concrete into cement and aggregates along the last (material) axis.
    pub fn apply<D: Dimension>(&self, values: &mut Array<f64, D>) {
        let material_axis = Axis(values.ndim() - 1);
        for mut lane in values.lanes_mut(material_axis) {
            let concrete = lane[self.concrete];
            lane[self.cement] += self.cement_share * concrete;
            lane[self.aggregates] += (1.0 - self.cement_share) * concrete;
            lane[self.concrete] = 0.0;
        }
    }
}

/// Mix the design archetypes into the intensity of future cohorts, `[c, q, k, x]`.
///
/// Cohort `offset + t` combines its plain design with the light-weighted, down-sized and
/// light-weighted down-sized designs using the shares of model year `t`, `[k, q, t]`.
/// Historic cohorts, the base-year cohort included, keep their plain intensity.
pub fn mix_archetypes(
    plain: &Array4<f64>,
    archetypes: &Archetypes,
    light_weighting: ArrayView3<f64>,
    down_sizing: ArrayView3<f64>,
    time: &TimeAxis,
) -> Array4<f64> {
    let mut mixed = plain.clone();
    if archetypes.is_empty() {
        return mixed;
    }
    let (_, n_regions, n_goods, n_items) = plain.dim();
    for t in time.model_years() {
        let c = time.cohort_index_for_year(t);
        if time.is_historic_cohort(c) {
            continue;
        }
        for q in 0..n_regions {
            for k in 0..n_goods {
                let lw = light_weighting[[k, q, t]];
                let ds = down_sizing[[k, q, t]];
                for x in 0..n_items {
                    let base = plain[[c, q, k, x]];
                    let pick = |table: &Option<Array3<f64>>| {
                        table.as_ref().map(|a| a[[q, k, x]]).unwrap_or(base)
                    };
                    mixed[[c, q, k, x]] = (1.0 - lw) * (1.0 - ds) * base
                        + lw * (1.0 - ds) * pick(&archetypes.light_weighting)
                        + (1.0 - lw) * ds * pick(&archetypes.down_sizing)
                        + lw * ds * pick(&archetypes.light_weighting_down_sizing);
                }
            }
        }
    }
    mixed
}

/// Element composition of a set of material flows, `[m, e]`.
///
/// Real elements are shares of the material total; the remainder element closes the mass so
/// that real elements sum to one. A material without flow is assigned entirely to the
/// remainder element.
pub fn element_composition(flows: ArrayView2<f64>, remainder: usize) -> Array2<f64> {
    let (n_materials, n_elements) = flows.dim();
    let mut composition = Array2::<f64>::zeros((n_materials, n_elements));
    for m in 0..n_materials {
        let total = flows[[m, 0]];
        composition[[m, 0]] = 1.0;
        if total == 0.0 {
            composition[[m, remainder]] = 1.0;
            continue;
        }
        let mut assigned = 0.0;
        for e in 1..n_elements {
            if e != remainder {
                let share = guarded_divide(flows[[m, e]], total);
                composition[[m, e]] = share;
                assigned += share;
            }
        }
        composition[[m, remainder]] = 1.0 - assigned;
    }
    composition
}

/// Per-cohort element composition of materials, `[c, m, e]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialCompositionResolver {
    time: TimeAxis,
    /// Composition of the manufacturing input of each cohort
    manufactured: Array3<f64>,
    /// Composition of each cohort as it entered the in-use stock, re-used parts included
    in_use: Array3<f64>,
}

impl MaterialCompositionResolver {
    /// Every cohort starts with the composition of the existing stock, `[m, e]`.
    pub fn new(time: TimeAxis, existing: ArrayView2<f64>) -> Self {
        let (n_materials, n_elements) = existing.dim();
        let table = Array3::from_shape_fn((time.n_cohorts, n_materials, n_elements), |(_, m, e)| {
            existing[[m, e]]
        });
        Self {
            time,
            manufactured: table.clone(),
            in_use: table,
        }
    }

    pub fn in_use_composition(&self, c: usize) -> ArrayView2<'_, f64> {
        self.in_use.index_axis(Axis(0), c)
    }

    pub fn manufactured_composition(&self, c: usize) -> ArrayView2<'_, f64> {
        self.manufactured.index_axis(Axis(0), c)
    }

    /// `[c, m, e]`
    pub fn in_use(&self) -> &Array3<f64> {
        &self.in_use
    }

    /// `[c, m, e]`
    pub fn manufactured(&self) -> &Array3<f64> {
        &self.manufactured
    }

    /// Element-resolved mass of one unit of product `k` of cohort `c` in region `q`, `[m, e]`.
    pub fn product_composition(
        &self,
        sector: &ScenarioSector,
        c: usize,
        q: usize,
        k: usize,
    ) -> Array2<f64> {
        let unit = sector.kind.mass_unit_factor();
        let mut composition = self.in_use_composition(c).to_owned();
        for (m, mut row) in composition.axis_iter_mut(Axis(0)).enumerate() {
            let content = sector.material_content[[c, q, k, m]] * unit;
            row.mapv_inplace(|v| v * content);
        }
        composition
    }

    /// Fix the composition of the cohort entering the stock in a model year.
    ///
    /// Historic cohorts are exogenous and are left unchanged.
    pub fn record_cohort(
        &mut self,
        c: usize,
        manufactured: ArrayView2<f64>,
        consumption: ArrayView2<f64>,
    ) {
        if self.time.is_historic_cohort(c) {
            return;
        }
        self.manufactured.index_axis_mut(Axis(0), c).assign(&manufactured);
        self.in_use.index_axis_mut(Axis(0), c).assign(&consumption);
    }

    /// Element-resolved material of product quantities per cohort, `[q, k, m, e]`.
    ///
    /// `quantities` is indexed `[c, q, k]`; only cohorts in `cohorts` contribute.
    pub fn element_flows(
        &self,
        sector: &ScenarioSector,
        quantities: ArrayView3<f64>,
        cohorts: Range<usize>,
    ) -> Array4<f64> {
        let (_, n_regions, n_goods) = quantities.dim();
        let (_, n_materials, n_elements) = self.in_use.dim();
        let mut flows = Array4::<f64>::zeros((n_regions, n_goods, n_materials, n_elements));
        for c in cohorts {
            for q in 0..n_regions {
                for k in 0..n_goods {
                    let quantity = quantities[[c, q, k]];
                    if quantity == 0.0 {
                        continue;
                    }
                    flows
                        .slice_mut(s![q, k, .., ..])
                        .scaled_add(quantity, &self.product_composition(sector, c, q, k));
                }
            }
        }
        flows
    }

    /// Material mass of product quantities of a single cohort, `[q, k, m]`.
    pub fn material_mass(
        sector: &ScenarioSector,
        quantities: ArrayView2<f64>,
        c: usize,
    ) -> Array3<f64> {
        let (n_regions, n_goods) = quantities.dim();
        let n_materials = sector.material_content.len_of(Axis(3));
        let unit = sector.kind.mass_unit_factor();
        Array3::from_shape_fn((n_regions, n_goods, n_materials), |(q, k, m)| {
            quantities[[q, k]] * sector.material_content[[c, q, k, m]] * unit
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array4};

    fn time() -> TimeAxis {
        TimeAxis::new(2010, 4, 2).unwrap()
    }

    // ===== Concrete Split Tests =====

    #[test]
    fn concrete_split_moves_mass_into_cement_and_aggregates() {
        let materials =
            Classification::from_labels("Material", &["steel", "cement", "concrete", "aggregates"]);
        let split = ConcreteSplit::resolve(&materials, &SpecialItems::default(), 0.13).unwrap();
        let mut values = array![[1.0, 2.0, 100.0, 0.0], [0.0, 0.0, 10.0, 1.0]];
        split.apply(&mut values);
        assert_relative_eq!(values[[0, 1]], 15.0);
        assert_relative_eq!(values[[0, 3]], 87.0);
        assert_eq!(values[[0, 2]], 0.0);
        assert_relative_eq!(values[[1, 3]], 9.7);
        // total mass is unchanged
        assert_relative_eq!(values.sum(), 1.0 + 2.0 + 100.0 + 11.0);
    }

    #[test]
    fn concrete_split_needs_all_three_materials() {
        let materials = Classification::from_labels("Material", &["steel", "concrete"]);
        assert!(ConcreteSplit::resolve(&materials, &SpecialItems::default(), 0.13).is_none());
    }

    // ===== Archetype Mixing Tests =====

    #[test]
    fn mixing_weights_archetypes_by_shares() {
        let time = time();
        let plain = Array4::from_elem((4, 1, 1, 1), 10.0);
        let archetypes = Archetypes {
            light_weighting: Some(Array3::from_elem((1, 1, 1), 6.0)),
            down_sizing: Some(Array3::from_elem((1, 1, 1), 8.0)),
            light_weighting_down_sizing: None,
        };
        // shares per model year, [k, q, t]
        let lw = Array3::from_shape_vec((1, 1, 2), vec![0.0, 0.5]).unwrap();
        let ds = Array3::from_shape_vec((1, 1, 2), vec![0.0, 0.5]).unwrap();
        let mixed = mix_archetypes(&plain, &archetypes, lw.view(), ds.view(), &time);

        assert_eq!(mixed[[0, 0, 0, 0]], 10.0);
        assert_eq!(mixed[[2, 0, 0, 0]], 10.0);
        // 0.25 plain + 0.25 lw + 0.25 ds + 0.25 plain (missing lwds)
        assert_relative_eq!(mixed[[3, 0, 0, 0]], 0.25 * (10.0 + 6.0 + 8.0 + 10.0));
    }

    #[test]
    fn without_archetypes_intensity_is_unchanged() {
        let time = time();
        let plain = Array4::from_shape_fn((4, 1, 2, 1), |(c, _, k, _)| (c + k) as f64);
        let shares = Array3::from_elem((2, 1, 2), 0.7);
        let mixed = mix_archetypes(
            &plain,
            &Archetypes::default(),
            shares.view(),
            shares.view(),
            &time,
        );
        assert_eq!(mixed, plain);
    }

    // ===== Element Composition Tests =====

    #[test]
    fn composition_closes_with_remainder() {
        let flows = array![[10.0, 2.0, 3.0, 4.0], [0.0, 0.0, 0.0, 0.0]];
        let composition = element_composition(flows.view(), 3);
        assert_eq!(composition[[0, 0]], 1.0);
        assert_relative_eq!(composition[[0, 1]], 0.2);
        assert_relative_eq!(composition[[0, 2]], 0.3);
        assert_relative_eq!(composition[[0, 3]], 0.5);
        // empty material goes to the remainder
        assert_eq!(composition.row(1).to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn real_elements_never_exceed_all() {
        let flows = array![[5.0, 1.0, 1.0, 3.0]];
        let composition = element_composition(flows.view(), 3);
        let real: f64 = composition.row(0).iter().skip(1).sum();
        assert_relative_eq!(real, composition[[0, 0]], epsilon = 1e-12);
        assert!(composition.row(0).iter().all(|v| *v <= 1.0));
    }

    // ===== Resolver Tests =====

    #[test]
    fn historic_cohorts_are_not_overwritten() {
        let time = time();
        let existing = array![[1.0, 0.4, 0.6]];
        let mut resolver = MaterialCompositionResolver::new(time, existing.view());
        let new = array![[1.0, 0.9, 0.1]];

        resolver.record_cohort(2, new.view(), new.view());
        assert_eq!(resolver.in_use_composition(2), existing);

        resolver.record_cohort(3, new.view(), new.view());
        assert_eq!(resolver.in_use_composition(3), new);
        assert_eq!(resolver.manufactured_composition(3), new);
    }
}
