use std::path::PathBuf;

use tracing::debug;

use super::error::PipelineError;
use super::processor::{ProcessedEntity, ProcessedModule};
use crate::audit::RunStatistics;
use crate::domain::{Cents, Route};
use crate::io::{AreaOutputs, EntityRow, ModuleRow, OUTPUT_SCHEMA_VERSION, SummaryRow};

/// Sends processed entities to their output families.
///
/// Entity and summary rows are attempted once per identity change within a
/// family; they are not deduplicated here. Module rows are append-only.
pub struct OutputRouter {
    outputs: AreaOutputs,
    last_emitted: [Option<String>; 2],
    stats: RunStatistics,
}

impl OutputRouter {
    pub fn new(outputs: AreaOutputs) -> Self {
        Self {
            outputs,
            last_emitted: [None, None],
            stats: RunStatistics::new(),
        }
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    pub async fn route(&mut self, entity: &ProcessedEntity) -> Result<(), PipelineError> {
        for route in entity.routes() {
            let slot = &mut self.last_emitted[route.index()];
            if slot.as_deref() != Some(entity.key.as_str()) {
                *slot = Some(entity.key.clone());
                self.write_identity(route, entity).await?;
            }

            for module in entity.modules_in(route) {
                self.outputs
                    .write_module(route, &module_row(module))
                    .await
                    .map_err(PipelineError::Output)?;
                self.stats
                    .record_module(route, module.contribution)
                    .map_err(|_| PipelineError::TotalsOverflow)?;
            }
        }

        debug!(key = %entity.key, routes = ?entity.routes(), "Routed entity");
        Ok(())
    }

    async fn write_identity(
        &mut self,
        route: Route,
        entity: &ProcessedEntity,
    ) -> Result<(), PipelineError> {
        let (Some(entity_row), Some(summary_row)) =
            (entity_row(route, entity), summary_row(route, entity))
        else {
            return Ok(());
        };

        self.outputs
            .write_entity(route, &entity_row)
            .await
            .map_err(PipelineError::Output)?;
        self.outputs
            .write_summary(route, &summary_row)
            .await
            .map_err(PipelineError::Output)?;
        self.stats.record_entity(route);
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), PipelineError> {
        self.outputs.flush().await.map_err(PipelineError::Output)
    }

    /// Close every stream; only now do outputs appear under their final names
    pub async fn close(self) -> Result<(Vec<PathBuf>, RunStatistics), PipelineError> {
        let paths = self.outputs.close().await.map_err(PipelineError::Output)?;
        Ok((paths, self.stats))
    }
}

fn entity_row(route: Route, entity: &ProcessedEntity) -> Option<EntityRow> {
    let first = &entity.first_module()?.record;
    let state = &entity.state;
    Some(EntityRow {
        schema: OUTPUT_SCHEMA_VERSION,
        tin: first.identifier.clone(),
        tin_type: first.tin_type.clone(),
        file_source: first.file_source.clone(),
        name_control: first.name_control.clone(),
        cycle: first.cycle.clone(),
        route,
        entity_type: state.entity_type().code(),
        transfer_flag: state.transfer_flag().code(),
        age_severity: state.age().code(),
        statute_severity: state.statute().code(),
        module_count: state.modules(),
        balance: state.balance(),
    })
}

fn summary_row(route: Route, entity: &ProcessedEntity) -> Option<SummaryRow> {
    let first = &entity.first_module()?.record;
    let modules: Vec<&ProcessedModule> = entity.modules_in(route).collect();
    let balance = modules
        .iter()
        .try_fold(Cents::zero(), |acc, m| acc.checked_add(m.contribution))?;
    let periods = modules.iter().map(|m| m.record.tax_period.raw.as_str());

    Some(SummaryRow {
        schema: OUTPUT_SCHEMA_VERSION,
        tin: first.identifier.clone(),
        tin_type: first.tin_type.clone(),
        file_source: first.file_source.clone(),
        cycle: first.cycle.clone(),
        route,
        modules: modules.len(),
        balance,
        earliest_period: periods.clone().min()?.to_string(),
        latest_period: periods.max()?.to_string(),
    })
}

fn module_row(module: &ProcessedModule) -> ModuleRow {
    let record = &module.record;
    ModuleRow {
        schema: OUTPUT_SCHEMA_VERSION,
        tin: record.identifier.clone(),
        tin_type: record.tin_type.clone(),
        file_source: record.file_source.clone(),
        sequence: module.sequence,
        family: record.family.code(),
        record_type: record.record_type.code(),
        tax_period: record.tax_period.raw.clone(),
        mft: record.mft,
        routing_code: record.routing_code.clone(),
        balance: record.balance,
        running_balance: module.running_balance,
        assessment_date: record.assessment_date.format("%Y-%m-%d").to_string(),
        csed: record.csed.format("%Y-%m-%d").to_string(),
    }
}
