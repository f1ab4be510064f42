//! Search command

use super::open_service;
use crate::app::{OutputFormat, PatientArgs, SearchArgs};
use crate::output::{format_retrieval, FormatOptions};
use anyhow::Result;
use medrag_core::{Config, ConsultationRequest, PatientContext};

pub async fn run(args: SearchArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let ctx = patient_context(&query, &args.patient)?;
    let service = open_service(config)?;

    let retrieval = service.search(&query, &ctx, args.top_k).await?;

    let options = FormatOptions { full: args.full };
    print!("{}", format_retrieval(&retrieval, format, &options));
    Ok(())
}

/// Validate patient flags the same way consultation requests are validated
pub fn patient_context(query: &str, patient: &PatientArgs) -> Result<PatientContext> {
    let request = ConsultationRequest {
        age: patient.age,
        gender: patient.gender.clone(),
        conditions: patient.conditions.clone(),
        ..ConsultationRequest::new(query)
    };
    Ok(request.patient_context()?)
}
