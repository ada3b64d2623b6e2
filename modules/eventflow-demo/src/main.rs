//! Patient-registry walkthrough: a clinic app wiring listeners onto the bus.
//!
//! Usage: `eventflow-demo [--config eventflow.toml]`. Without a config file
//! the bus settings come from `EVENTFLOW_*` environment variables.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use eventflow::{load_config, BusConfig, EventBus};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("eventflow=info".parse()?))
        .init();

    info!(version = eventflow::VERSION, "Eventflow demo starting...");

    let config = match config_path()? {
        Some(path) => load_config(&path)?,
        None => BusConfig::from_env()?,
    };
    info!(policy = ?config.failure_policy, "Bus configured");

    let bus = Arc::new(EventBus::with_config(config));
    let patients = patient_records();
    let medical_records: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let records = medical_records.clone();
    let create_medical_record = bus.listen("new:patient", move |event| {
        let id = event.data["patient_id"].as_str().unwrap_or_default();
        let Some(patient) = patients.get(id) else {
            bail!("no patient with id '{id}'");
        };
        let name = patient["name"].as_str().unwrap_or_default().to_string();
        println!("New medical record created for {name}");
        records
            .lock()
            .map_err(|_| anyhow!("medical record store poisoned"))?
            .push(name);
        Ok(())
    });

    bus.listen("new:patient", |event| {
        event.data["welcome_mail_sent"] = json!(true);
        Ok(())
    });

    let audit = Arc::downgrade(&bus);
    bus.listen("appointment:booked", move |event| {
        println!(
            "Appointment booked at {} for {}",
            event.timestamp().to_rfc3339(),
            event.data["patient_id"]
        );
        if let Some(bus) = audit.upgrade() {
            bus.fire("audit", &mut event.data)?;
        }
        Ok(())
    });
    bus.listen("audit", |event| {
        println!("audit: {} {}", event.event_type(), event.data);
        Ok(())
    });

    println!("{bus}");

    let mut data = json!({"patient_id": "1"});
    bus.fire("new:patient", &mut data)?;
    info!(payload = %data, "Patient 1 registered");

    let mut data = json!({"patient_id": "2"});
    bus.fire_many(["new:patient", "appointment:booked"], &mut data)?;

    if let Err(e) = bus.fire("new:patient", &mut json!({"patient_id": "3"})) {
        warn!(error = %e, "Registration failed");
    }

    bus.fire_empty("clinic:closed")?;

    bus.unregister("new:patient", &create_medical_record)?;
    for (event_type, count) in bus.listener_count_by_type() {
        println!("{event_type}: {count} listener(s)");
    }
    println!("total listeners: {}", bus.total_listener_count());

    let created = medical_records
        .lock()
        .map_err(|_| anyhow!("medical record store poisoned"))?
        .len();
    info!(created, "Eventflow demo finished");

    Ok(())
}

fn config_path() -> Result<Option<PathBuf>> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(None),
        Some("--config") => args
            .next()
            .map(|p| Some(PathBuf::from(p)))
            .ok_or_else(|| anyhow!("--config requires a path")),
        Some(other) => bail!("unexpected argument '{other}'"),
    }
}

fn patient_records() -> Value {
    json!({
        "1": {
            "name": "Charles A. Schneider",
            "email": "CharlesASchneider@gmail.com",
            "birthday": "April 14, 1992",
        },
        "2": {
            "name": "Donna M. Holmes",
            "email": "DonnaMHolmes@gmail.com",
            "birthday": "October 13, 1981",
        },
    })
}
