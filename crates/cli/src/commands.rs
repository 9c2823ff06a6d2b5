//! Command handlers.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use techpassport_core::PassportId;
use techpassport_infra::{
    AddBuilding, ConnectionProvider, LocationPlanService, SavePlan, SqliteLocationPlanRepository,
    StorageConfig, StorageError, UnitOfWork,
};
use techpassport_location_plan::{CoordinateSystemRegistry, LocationPlanView, PlanScale};

use crate::cli::Command;

type Service = LocationPlanService<SqliteLocationPlanRepository>;

fn open_service(config: &StorageConfig) -> anyhow::Result<(Arc<ConnectionProvider>, Service)> {
    let provider = Arc::new(
        ConnectionProvider::open(config)
            .with_context(|| format!("failed to open database at {}", config.location))?,
    );
    let repository = SqliteLocationPlanRepository::new(UnitOfWork::new(provider.clone()));
    let service = LocationPlanService::new(repository, Arc::new(CoordinateSystemRegistry::builtin()));
    Ok((provider, service))
}

fn passport(raw: &str) -> anyhow::Result<PassportId> {
    PassportId::parse(raw).with_context(|| format!("invalid passport id '{raw}'"))
}

fn print_json(out: &mut impl Write, value: &impl serde::Serialize) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

/// Run one command, writing its output to `out`.
pub fn run(command: Command, config: &StorageConfig, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Scales => {
            for scale in PlanScale::all() {
                writeln!(out, "{scale}")?;
            }
            return Ok(());
        }
        Command::Regions => {
            for (region, system) in CoordinateSystemRegistry::builtin().regions() {
                writeln!(out, "{region}\t{}\t{}", system.code, system.region_name)?;
            }
            return Ok(());
        }
        _ => {}
    }

    let (provider, service) = open_service(config)?;
    let result = run_with_service(command, &service, out);
    finish(result, provider.close())
}

/// A close failure is reported only when the command itself succeeded.
fn finish(result: anyhow::Result<()>, closed: Result<(), StorageError>) -> anyhow::Result<()> {
    match (result, closed) {
        (Ok(()), closed) => closed.context("failed to close database"),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(error = %close_err, "failed to close database after command error");
            Err(err)
        }
    }
}

fn run_with_service(command: Command, service: &Service, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Init {
            passport: raw,
            scale,
            executor,
            date,
            notes,
            image,
        } => {
            let passport_id = match raw {
                Some(raw) => passport(&raw)?,
                None => PassportId::generate(),
            };
            let plan = service.save_plan(SavePlan {
                passport_id,
                scale,
                executor_name: executor,
                plan_date: date,
                notes,
                image_path: image,
            })?;
            info!(passport_id = %plan.passport_id(), "plan saved");
            writeln!(out, "{}", plan.passport_id())?;
        }
        Command::Show { passport: raw, region } => {
            let plan = service.load_plan(&passport(&raw)?)?;
            print_json(out, &LocationPlanView::from(&plan))?;
            if let Some(region) = region {
                match service.coordinate_system_for(&region) {
                    Some(system) => writeln!(out, "{}\t{}", system.code, system.region_name)?,
                    None => anyhow::bail!("unknown region code '{region}'"),
                }
            }
        }
        Command::AddBuilding {
            passport: raw,
            litera,
            description,
            points,
        } => {
            let plan = service.add_building(AddBuilding {
                passport_id: passport(&raw)?,
                litera,
                description,
                points,
            })?;
            writeln!(out, "{} buildings", plan.building_count())?;
        }
        Command::RemoveBuilding { passport: raw, litera } => {
            let plan = service.remove_building(&passport(&raw)?, &litera)?;
            writeln!(out, "{} buildings", plan.building_count())?;
        }
        Command::SetScale { passport: raw, scale } => {
            let passport_id = passport(&raw)?;
            // Only an existing plan can be rescaled.
            service.load_plan(&passport_id)?;
            let plan = service.save_plan(SavePlan::new(passport_id, scale))?;
            writeln!(out, "{}", plan.scale())?;
        }
        Command::Delete { passport: raw } => {
            service.delete_plan(&passport(&raw)?)?;
            writeln!(out, "deleted {raw}")?;
        }
        Command::Scales | Command::Regions => {}
    }
    Ok(())
}
