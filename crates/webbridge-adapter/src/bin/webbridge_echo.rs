//! webbridge-echo: Run a bridge against an in-process embedded context.
//!
//! Emits a `ping` event and calls the embedded `sum` function, then pumps
//! the replies back through the chosen inbound channel. Useful for seeing
//! the generated scripts and the message flow with `--verbose`.
//!
//! # Usage
//!
//! ```bash
//! webbridge-echo --channel pull --verbose 2 3 5
//! ```

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{error, info};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;
use webbridge_adapter::{LoopbackContext, PullChannel, PushChannel, ReadinessGate};
use webbridge_runtime::{Bridge, InstanceDirectory, ProtocolConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Channel {
    /// Native callable invoked by the embedded context
    Push,
    /// Pseudo-URL interception plus a fetch round trip
    Pull,
}

/// Exercise the webbridge protocol against a loopback embedded context.
#[derive(Parser, Debug)]
#[command(name = "webbridge-echo")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Numbers passed to the embedded `sum` function
    #[arg(value_name = "NUMBER", default_values_t = vec![2, 3])]
    numbers: Vec<i64>,

    /// Inbound channel used for replies
    #[arg(short, long, value_enum, default_value = "push")]
    channel: Channel,

    /// Protocol configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initial URL loaded once the bridge is ready
    #[arg(long, default_value = "app://index.html")]
    url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let config = match &args.config {
        Some(path) => match ProtocolConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => ProtocolConfig::default(),
    };

    let directory = InstanceDirectory::new();
    let context = LoopbackContext::new(config.clone());
    context.define_function("sum", |args| {
        let mut total = 0i64;
        for arg in args {
            total += arg
                .as_i64()
                .ok_or_else(|| json!(format!("not an integer: {}", arg)))?;
        }
        Ok(json!(total))
    });
    context.on_event("ping", |ctx, data| ctx.post("pong", data));

    let bridge = match Bridge::builder(context.clone())
        .with_loader(context.clone())
        .with_config(config.clone())
        .with_initial_url(args.url.clone())
        .awaiting_ready()
        .attach(&directory)
    {
        Ok(bridge) => bridge,
        Err(e) => {
            error!("Failed to attach bridge: {}", e);
            process::exit(1);
        }
    };
    context.bind(bridge.id());
    info!("Attached bridge {}", bridge.id());

    let outcome: Rc<RefCell<Option<Result<Value, Value>>>> = Rc::new(RefCell::new(None));
    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        bridge.on("pong", |data| info!("pong: {}", data))?;
        bridge.emit("ping", &json!({ "numbers": args.numbers }))?;

        let ok = outcome.clone();
        let err = outcome.clone();
        let numbers: Vec<Value> = args.numbers.iter().map(|n| json!(n)).collect();
        let request_id = bridge.call_remote_function(
            "sum",
            numbers,
            move |v| *ok.borrow_mut() = Some(Ok(v)),
            move |v| *err.borrow_mut() = Some(Err(v)),
        )?;
        info!("Queued call {} ({} scripts waiting)", request_id, bridge.queued_scripts());

        ReadinessGate::new(bridge.clone()).on_load_finished("about:blank")?;
        info!("Loaded {}", context.location().unwrap_or_default());

        let delivered = match args.channel {
            Channel::Push => context.pump_push(&PushChannel::new(directory.clone()))?,
            Channel::Pull => context.pump_pull(&PullChannel::new(
                directory.clone(),
                context.clone(),
                config.clone(),
            ))?,
        };
        info!("Delivered {} message(s) via {:?}", delivered, args.channel);
        Ok(())
    })();

    if let Err(e) = result {
        error!("Bridge error: {}", e);
        process::exit(1);
    }

    match outcome.borrow_mut().take() {
        Some(Ok(total)) => info!("sum = {}", total),
        Some(Err(reason)) => {
            error!("sum failed: {}", reason);
            process::exit(1);
        }
        None => {
            error!("No reply received");
            process::exit(1);
        }
    }

    bridge.destroy();
    info!("Destroyed bridge, {} instance(s) remain", directory.len());
}
