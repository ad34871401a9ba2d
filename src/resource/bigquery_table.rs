//! Silver-layer BigQuery table resource.

use gcloudkit::{CliRunner, Tool};
use reconcile::{ProbedState, Provision, Result, RunContext};
use std::sync::Arc;

use super::{apply_error, probe_error};

/// Column schema of the current-conditions table, matching the rows the
/// processor function inserts.
const SCHEMA: &str = "nombre_ubicacion:STRING,\
latitud:FLOAT,\
longitud:FLOAT,\
hora_actual:TIMESTAMP,\
zona_horaria:STRING,\
temperatura:FLOAT,\
sensacion_termica:FLOAT,\
punto_rocio:FLOAT,\
indice_calor:FLOAT,\
sensacion_viento:FLOAT,\
condicion_clima:STRING,\
descripcion_clima:STRING,\
probabilidad_precipitacion:FLOAT,\
precipitacion_acumulada:FLOAT,\
presion_aire:FLOAT,\
velocidad_viento:FLOAT,\
direccion_viento:FLOAT,\
visibilidad:FLOAT,\
humedad_relativa:FLOAT,\
indice_uv:FLOAT,\
probabilidad_tormenta:FLOAT,\
cobertura_nubes:FLOAT,\
es_dia:BOOLEAN,\
marca_tiempo_ingestion:TIMESTAMP,\
uri_datos_crudos:STRING,\
datos_json_crudo:STRING";

/// Dataset plus table, partitioned by observation time and clustered by
/// location name. One declaration covers both: the dataset has no life
/// of its own in this pipeline.
#[derive(Debug)]
pub struct BigQueryTable {
    cli: Arc<dyn CliRunner>,
    project: String,
    dataset: String,
    table: String,
    location: String,
}

impl BigQueryTable {
    pub fn new(
        cli: Arc<dyn CliRunner>,
        project: &str,
        dataset: &str,
        table: &str,
        location: &str,
    ) -> Self {
        Self {
            cli,
            project: project.to_string(),
            dataset: dataset.to_string(),
            table: table.to_string(),
            location: location.to_string(),
        }
    }

    fn table_ref(&self) -> String {
        format!("{}:{}.{}", self.project, self.dataset, self.table)
    }

    fn dataset_ref(&self) -> String {
        format!("{}:{}", self.project, self.dataset)
    }
}

impl Provision for BigQueryTable {
    fn kind(&self) -> &'static str {
        "table"
    }

    fn describe(&self) -> String {
        format!("BigQuery table {}", self.table_ref())
    }

    fn probe(&self, _ctx: &RunContext) -> Result<ProbedState> {
        let table_ref = self.table_ref();
        let probed = self
            .cli
            .probe_json(Tool::Bq, &["show", "--format=json", &table_ref], &table_ref)
            .map_err(|e| probe_error(&table_ref, &e))?;

        Ok(match probed {
            Some(_) => ProbedState::present(),
            None => ProbedState::Absent,
        })
    }

    fn create(&self, _ctx: &RunContext) -> Result<()> {
        let dataset_ref = self.dataset_ref();
        let made_dataset = self.cli.run_checked(
            Tool::Bq,
            &[
                "mk",
                "--dataset",
                &format!("--location={}", self.location),
                &dataset_ref,
            ],
            Some(&dataset_ref),
        );
        match made_dataset {
            Ok(_) => {}
            // The table can be absent while its dataset exists.
            Err(e) if e.is_ignorable() => {}
            Err(e) => return Err(apply_error(&dataset_ref, &e)),
        }

        let table_ref = self.table_ref();
        self.cli
            .run_checked(
                Tool::Bq,
                &[
                    "mk",
                    "--table",
                    "--time_partitioning_field=hora_actual",
                    "--time_partitioning_type=DAY",
                    "--clustering_fields=nombre_ubicacion",
                    &table_ref,
                    SCHEMA,
                ],
                Some(&table_ref),
            )
            .map_err(|e| apply_error(&table_ref, &e))?;
        Ok(())
    }
}
