//! traitloop demo
//!
//! MemoryStore 上で ManualScalerTrait → CoolWorkload → Object の流れを再現し、
//! Controller が Translation の replicas を Trait に合わせるまでを表示します。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use traitloop_core::domain::{Kind, ModifyError, Object, ObjectKey, TYPE_SYNCED, TypedReference};
use traitloop_core::impls::{MemoryStore, TracingRecorder};
use traitloop_core::modifier::{FieldAccessor, ModifyContext, ModifyFn, with_accessor};
use traitloop_core::{Config, Controller, ReconcilerBuilder, TraitKinds};

#[derive(Parser)]
#[command(name = "traitloop")]
#[command(about = "Reconcile a ManualScalerTrait against an in-memory store")]
#[command(version)]
struct Cli {
    /// JSON config file (reconciler waits/timeout, controller workers/retry)
    #[arg(long, env = "TRAITLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Number of controller workers (overrides the config file)
    #[arg(long)]
    workers: Option<usize>,

    /// replicaCount written to the trait
    #[arg(long, default_value_t = 3)]
    replicas: u32,

    /// Give up waiting for convergence after this many seconds
    #[arg(long, default_value_t = 10)]
    deadline_secs: u64,
}

/// Trait の replicaCount を view（Translation の spec.deployment）の replicas に写す
fn scale(_ctx: &ModifyContext, view: &mut Object, tr: &Object) -> Result<(), ModifyError> {
    let raw = tr
        .spec
        .get("replicaCount")
        .cloned()
        .ok_or_else(|| ModifyError::Other("trait has no replicaCount".to_string()))?;
    let replicas: u32 = serde_json::from_value(raw).map_err(|source| ModifyError::Decode {
        what: "replicaCount".to_string(),
        source,
    })?;
    view.spec["replicas"] = json!(replicas);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => demo_config(),
    };
    if let Some(workers) = cli.workers {
        config.controller.workers = workers;
    }
    config.validate().context("invalid config")?;

    let kinds = TraitKinds::new(
        Kind::new("core.oam.dev/v1alpha2", "ManualScalerTrait"),
        Kind::new("example.org/v1", "CoolWorkload"),
        Kind::new("v1", "Object"),
    );
    let store = Arc::new(MemoryStore::new());

    let reconciler = ReconcilerBuilder::new(store.clone(), kinds.clone())
        .with_modifier(Arc::new(with_accessor(
            ModifyFn(scale),
            FieldAccessor::new("/deployment"),
        )))
        .with_recorder(Arc::new(TracingRecorder))
        .with_config(config.reconciler.clone())
        .build()
        .context("building reconciler")?;
    let controller = Controller::spawn(Arc::new(reconciler), &config.controller);
    let deadline = Duration::from_secs(cli.deadline_secs);

    // (A) Trait だけ作る: Workload 待ちになる
    let trait_key = ObjectKey::new("default", "t1");
    let workload_key = ObjectKey::new("default", "w1");
    let mut tr = Object::new(kinds.trait_kind.clone(), trait_key.clone())
        .with_spec(json!({ "replicaCount": cli.replicas }));
    tr.set_workload_reference(&TypedReference::to(&kinds.workload_kind, "w1"));
    store.create(tr).await?;
    controller.enqueue(trait_key.clone()).await;

    let tr = wait_for(&store, &kinds.trait_kind, &trait_key, deadline, |o| {
        o.get_condition(TYPE_SYNCED).is_some()
    })
    .await?;
    print_object("trait (workload missing)", &tr)?;

    // (B) Workload と Translation を作る: 次の requeue で収束する
    store
        .create(Object::new(kinds.workload_kind.clone(), workload_key.clone()))
        .await?;
    store
        .create(
            Object::new(kinds.translation_kind.clone(), workload_key.clone())
                .with_spec(json!({ "deployment": { "replicas": 1 } })),
        )
        .await?;
    info!(workload = %workload_key, "created workload and translation");

    let want = json!(cli.replicas);
    let translation = wait_for(&store, &kinds.translation_kind, &workload_key, deadline, |o| {
        o.spec.pointer("/deployment/replicas") == Some(&want)
    })
    .await?;
    print_object("translation", &translation)?;

    let tr = store
        .get_object(&kinds.trait_kind, &trait_key)
        .await
        .context("trait disappeared")?;
    print_object("trait (synced)", &tr)?;

    controller.shutdown_and_join().await;
    Ok(())
}

/// Short waits so the demo converges quickly.
fn demo_config() -> Config {
    let mut config = Config::default();
    config.reconciler.short_wait = Duration::from_millis(200);
    config.reconciler.long_wait = Duration::from_secs(1);
    config
}

/// Poll the store until `pred` holds for the object at `key`.
async fn wait_for(
    store: &MemoryStore,
    kind: &Kind,
    key: &ObjectKey,
    deadline: Duration,
    pred: impl Fn(&Object) -> bool,
) -> Result<Object> {
    let started = tokio::time::Instant::now();
    loop {
        match store.get_object(kind, key).await {
            Some(obj) if pred(&obj) => return Ok(obj),
            _ => {}
        }
        if started.elapsed() >= deadline {
            bail!("{kind} {key} did not converge within {deadline:?}");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn print_object(label: &str, obj: &Object) -> Result<()> {
    println!("--- {label}");
    println!("{}", serde_json::to_string_pretty(obj)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
