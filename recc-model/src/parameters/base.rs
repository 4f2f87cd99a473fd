use super::*;
use crate::config::ModelConfig;
use crate::sectors::{resolve_sectors, DriverKind, ResolvedSector, Scope};
use log::info;
use recc_core::classification::{Aspect, ClassificationSet};
use recc_core::errors::{RECCError, RECCResult};
use recc_core::parameter::ParameterSet;

/// The caller's parameters, checked once against the classifications and the configuration.
///
/// Every configuration error is raised here or in [`BaseParameters::preprocess`], so a run
/// never fails once the scenario loop has started.
#[derive(Debug, Clone)]
pub struct BaseParameters {
    parameters: ParameterSet,
    classifications: ClassificationSet,
    config: ModelConfig,
    sectors: Vec<ResolvedSector>,
}

impl BaseParameters {
    pub fn from_parameter_set(
        parameters: &ParameterSet,
        classifications: &ClassificationSet,
        config: &ModelConfig,
    ) -> RECCResult<Self> {
        classifications.validate()?;
        let sectors = resolve_sectors(&config.sectors, classifications)?;
        classifications.index_of(
            Aspect::SocioeconomicScenario,
            &config.minimum_demand_scenario,
        )?;

        let missing = required_names(&sectors)
            .into_iter()
            .filter(|name| parameters.get(name).is_none())
            .collect::<Vec<_>>();
        if let Some(name) = missing.first() {
            return Err(RECCError::MissingParameter(name.clone()));
        }
        if parameters.get(GWP_BIO).is_some() {
            classifications.get(Aspect::Age)?;
        }

        info!(
            "Checked {} parameters for {} sector(s)",
            parameters.len(),
            sectors.len()
        );
        Ok(Self {
            parameters: parameters.clone(),
            classifications: classifications.clone(),
            config: config.clone(),
            sectors,
        })
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn classifications(&self) -> &ClassificationSet {
        &self.classifications
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn sectors(&self) -> &[ResolvedSector] {
        &self.sectors
    }

    /// Run the one-off preprocessing and freeze the result.
    pub fn preprocess(&self) -> RECCResult<PreparedParameters> {
        PreparedParameters::from_base(self)
    }
}

/// Parameters without which the configured sectors cannot run.
fn required_names(sectors: &[ResolvedSector]) -> Vec<String> {
    let mut names = vec![
        COMPOSITION_EXISTING_STOCK.to_string(),
        COMPOSITION_PRIMARY.to_string(),
        MANUFACTURING_YIELD_LOSS.to_string(),
        REMELTING_YIELD.to_string(),
    ];
    if sectors.iter().any(|s| s.kind.scope() == Scope::Regional) {
        names.push(POPULATION.to_string());
        names.push(EOL_RECOVERY_RATE.to_string());
    }
    if sectors.iter().any(|s| s.kind.scope() == Scope::Aggregate) {
        names.push(EOL_RECOVERY_RATE_AGGREGATE.to_string());
    }

    for sector in sectors {
        let kind = sector.kind;
        names.push(lifetime(kind));
        names.push(material_content(kind));
        match kind.driver() {
            DriverKind::Demand => {
                names.push(initial_stock(kind));
                names.push(type_split(kind));
                if kind == SectorKind::PassengerVehicles {
                    names.push(SERVICE_DEMAND.to_string());
                    names.push(VEHICLE_OCCUPANCY.to_string());
                    names.push(VEHICLE_KILOMETRAGE.to_string());
                } else {
                    names.push(future_stock_per_capita(kind));
                }
            }
            DriverKind::StockHistory => names.push(global_stock(kind)),
            DriverKind::Inflow => names.push(final_products_inflow(kind)),
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectorConfig;
    use ndarray::{ArrayD, IxDyn};
    use recc_core::classification::Classification;
    use recc_core::time::TimeAxis;

    fn classifications() -> ClassificationSet {
        ClassificationSet::new(TimeAxis::new(2014, 3, 2).unwrap())
            .with(Aspect::Region, Classification::from_labels("Region", &["R1"]))
            .with(Aspect::Good, Classification::from_labels("Good", &["SFH"]))
            .with(
                Aspect::Material,
                Classification::from_labels("Material", &["steel"]),
            )
            .with(
                Aspect::Element,
                Classification::from_labels("Element", &["All", "Other"]),
            )
            .with(
                Aspect::WasteCategory,
                Classification::from_labels("Waste", &["steel scrap"]),
            )
            .with(
                Aspect::EnergyCarrier,
                Classification::from_labels("Carrier", &["electricity"]),
            )
            .with(
                Aspect::SocioeconomicScenario,
                Classification::from_labels("SSP", &["LED", "SSP1"]),
            )
            .with(
                Aspect::ClimatePolicyScenario,
                Classification::from_labels("RCP", &["Base"]),
            )
    }

    fn config() -> ModelConfig {
        ModelConfig {
            sectors: vec![SectorConfig {
                kind: SectorKind::ResidentialBuildings,
                goods: vec!["SFH".to_string()],
            }],
            ..ModelConfig::default()
        }
    }

    #[test]
    fn missing_required_parameter_is_reported_by_name() {
        let result =
            BaseParameters::from_parameter_set(&ParameterSet::new(), &classifications(), &config());
        match result {
            Err(RECCError::MissingParameter(name)) => {
                assert_eq!(name, COMPOSITION_EXISTING_STOCK)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn unknown_floor_scenario_is_rejected() {
        let mut config = config();
        config.minimum_demand_scenario = "SSP5".to_string();
        let result =
            BaseParameters::from_parameter_set(&ParameterSet::new(), &classifications(), &config);
        assert!(matches!(
            result,
            Err(RECCError::MissingClassificationItem { .. })
        ));
    }

    #[test]
    fn gwp_bio_needs_age_classification() {
        let cls = classifications();
        let mut parameters = ParameterSet::new();
        for name in required_names(&resolve_sectors(&config().sectors, &cls).unwrap()) {
            parameters.insert(recc_core::parameter::Parameter {
                name: name.clone(),
                unit: "".to_string(),
                index_structure: recc_core::parameter::IndexStructure(vec![]),
                values: ArrayD::zeros(IxDyn(&[])),
            });
        }
        assert!(BaseParameters::from_parameter_set(&parameters, &cls, &config()).is_ok());

        parameters.insert(recc_core::parameter::Parameter {
            name: GWP_BIO.to_string(),
            unit: "".to_string(),
            index_structure: recc_core::parameter::IndexStructure(vec![]),
            values: ArrayD::zeros(IxDyn(&[])),
        });
        let result = BaseParameters::from_parameter_set(&parameters, &cls, &config());
        assert!(matches!(result, Err(RECCError::MissingClassification(_))));
    }

    #[test]
    fn required_names_follow_sector_drivers() {
        let cls = classifications().with(
            Aspect::AggregateRegion,
            Classification::from_labels("AggregateRegion", &["World"]),
        );
        let sectors = resolve_sectors(&config().sectors, &cls).unwrap();
        let names = required_names(&sectors);
        assert!(names.contains(&"2_S_RECC_FinalProducts_Future_resbuildings".to_string()));
        assert!(!names.contains(&SERVICE_DEMAND.to_string()));
        assert!(!names.contains(&EOL_RECOVERY_RATE_AGGREGATE.to_string()));

        let global = vec![SectorConfig {
            kind: SectorKind::NonResidentialBuildingsGlobal,
            goods: vec!["SFH".to_string()],
        }];
        let names = required_names(&resolve_sectors(&global, &cls).unwrap());
        assert!(names.contains(&"2_S_RECC_FinalProducts_nonresbuildings_g".to_string()));
        assert!(!names.contains(&final_products_inflow(SectorKind::NonResidentialBuildingsGlobal)));
        assert!(names.contains(&EOL_RECOVERY_RATE_AGGREGATE.to_string()));
    }
}
