//! Consult command

use super::open_service;
use crate::app::{ConsultArgs, OutputFormat};
use crate::output::format_report;
use anyhow::Result;
use medrag_core::{Config, ConsultationRequest};

pub async fn run(args: ConsultArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = ConsultationRequest {
        age: args.patient.age,
        gender: args.patient.gender,
        conditions: args.patient.conditions,
        medications: args.medications,
        top_k: args.top_k,
        ..ConsultationRequest::new(args.query.join(" "))
    };
    // Reject bad input before any snapshot is loaded
    request.patient_context()?;

    let service = open_service(config)?;
    let report = service.consult(&request).await?;

    print!("{}", format_report(&report, format));
    Ok(())
}
